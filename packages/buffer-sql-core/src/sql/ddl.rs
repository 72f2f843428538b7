//! CREATE TABLE.

use super::text::{paren_group, split_keyword, split_name, split_top_level, unquote_ident};
use super::QueryResult;
use crate::database::Database;
use crate::error::{DbError, Result};
use crate::table::ColumnSpec;
use crate::types::ColumnType;

/// Handles the text following `CREATE`.
pub(super) fn create(db: &Database, rest: &str) -> Result<QueryResult> {
    let (subcommand, rest) = split_keyword(rest);
    if !subcommand.eq_ignore_ascii_case("TABLE") {
        return Err(DbError::UnknownSubcommand {
            statement: "CREATE",
            subcommand: subcommand.to_string(),
        });
    }

    let (name, columns) = parse_create_table(rest)?;
    let table = db.create_table(&name, columns)?;
    Ok(QueryResult::Created(table))
}

/// Parses `name (col type[(size)], ...)` into a table name and column specs.
pub fn parse_create_table(text: &str) -> Result<(String, Vec<ColumnSpec>)> {
    let (name, rest) = split_name(text);
    let name = unquote_ident(name);
    if name.is_empty() {
        return Err(DbError::SyntaxError("CREATE TABLE requires a table name".to_string()));
    }

    let (inner, trailing) = paren_group(rest).ok_or_else(|| {
        DbError::SyntaxError(format!("CREATE TABLE {} requires a column list", name))
    })?;
    if !trailing.trim().is_empty() {
        return Err(DbError::SyntaxError(format!(
            "unexpected text after column list: '{}'",
            trailing.trim()
        )));
    }

    let columns = split_top_level(inner, b',')
        .into_iter()
        .map(parse_column)
        .collect::<Result<Vec<_>>>()?;

    Ok((name.to_string(), columns))
}

/// Parses `name type[(size)]`.
fn parse_column(entry: &str) -> Result<ColumnSpec> {
    let mut tokens = entry
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|t| !t.is_empty());

    let name = tokens
        .next()
        .map(unquote_ident)
        .ok_or_else(|| DbError::SyntaxError("empty column definition".to_string()))?;
    let type_name = tokens.next().ok_or_else(|| {
        DbError::SyntaxError(format!("column '{}' is missing a type", name))
    })?;
    let size = tokens.collect::<Vec<_>>().join(" ");
    let size = (!size.is_empty()).then_some(size.as_str());

    let column_type = ColumnType::from_declaration(type_name, size)?;
    Ok(ColumnSpec::new(name, column_type))
}
