//! INSERT INTO.

use std::collections::HashSet;

use super::text::{find_keyword, paren_group, split_keyword, split_name, split_top_level, unquote_ident};
use super::QueryResult;
use crate::database::Database;
use crate::error::{DbError, Result};

/// Handles the text following `INSERT`.
pub(super) fn insert(db: &Database, rest: &str) -> Result<QueryResult> {
    let (subcommand, rest) = split_keyword(rest);
    if !subcommand.eq_ignore_ascii_case("INTO") {
        return Err(DbError::UnknownSubcommand {
            statement: "INSERT",
            subcommand: subcommand.to_string(),
        });
    }
    insert_into(db, rest)
}

/// Handles `name [(cols)] [VALUES] (vals)`.
///
/// Without a column list every column is assigned in declaration order.
/// Without `VALUES` the single parenthesised group is the value list.
/// Every value is parsed and encoded before the row is claimed, so a
/// rejected statement never leaves a partial row behind. Columns left out
/// of an explicit list keep their zero fill.
fn insert_into(db: &Database, text: &str) -> Result<QueryResult> {
    let (name, rest) = split_name(text);
    let name = unquote_ident(name);
    if name.is_empty() {
        return Err(DbError::SyntaxError("INSERT INTO requires a table name".to_string()));
    }
    let table = db.get_table(name)?;

    let (column_names, values_text): (Vec<String>, &str) = match find_keyword(rest, "VALUES") {
        Some(at) => {
            let columns_text = rest[..at].trim();
            let names = if columns_text.is_empty() {
                table.column_names()
            } else {
                let (inner, trailing) = paren_group(columns_text).ok_or_else(|| {
                    DbError::SyntaxError("malformed column list".to_string())
                })?;
                if !trailing.trim().is_empty() {
                    return Err(DbError::SyntaxError(format!(
                        "unexpected text before VALUES: '{}'",
                        trailing.trim()
                    )));
                }
                split_top_level(inner, b',')
                    .into_iter()
                    .map(|c| unquote_ident(c).to_string())
                    .collect()
            };
            (names, &rest[at + "VALUES".len()..])
        }
        None => (table.column_names(), rest),
    };

    let (inner, trailing) = paren_group(values_text)
        .ok_or_else(|| DbError::SyntaxError("INSERT requires a value list".to_string()))?;
    if !trailing.trim().is_empty() {
        return Err(DbError::SyntaxError(format!(
            "unexpected text after value list: '{}'",
            trailing.trim()
        )));
    }
    let values = split_top_level(inner, b',');

    if column_names.len() != values.len() {
        return Err(DbError::ColumnValueCountMismatch {
            columns: column_names.len(),
            values: values.len(),
        });
    }

    let mut seen = HashSet::with_capacity(column_names.len());
    let mut slots = Vec::with_capacity(column_names.len());
    for (column_name, raw) in column_names.iter().zip(values) {
        let column = table.get_column(column_name)?;
        if !seen.insert(column_name.as_str()) {
            return Err(DbError::DuplicateColumn {
                table: table.name().to_string(),
                column: column_name.clone(),
            });
        }
        let value = column.parse(raw)?;
        slots.push((column, column.encode(&value)?));
    }

    let row_offset = table.allocate_row()?;
    table.write_row(row_offset, &slots)?;

    let row_index = row_offset / table.stride();
    tracing::debug!(table = table.name(), row_index, "row inserted");
    Ok(QueryResult::Inserted(row_index))
}
