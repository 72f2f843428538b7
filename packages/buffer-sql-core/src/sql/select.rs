//! SELECT ... FROM ... [WHERE ...].

use super::predicate;
use super::text::{find_keyword, split_top_level, unquote_ident};
use super::{QueryResult, SelectResult};
use crate::database::Database;
use crate::error::{DbError, Result};

/// Handles the text following `SELECT`.
pub(super) fn select(db: &Database, rest: &str) -> Result<QueryResult> {
    let from = find_keyword(rest, "FROM")
        .ok_or_else(|| DbError::SyntaxError("SELECT requires FROM".to_string()))?;
    let projection = rest[..from].trim();
    let after_from = &rest[from + "FROM".len()..];

    let (table_text, predicate_text) = match find_keyword(after_from, "WHERE") {
        Some(at) => (&after_from[..at], Some(&after_from[at + "WHERE".len()..])),
        None => (after_from, None),
    };
    let name = unquote_ident(table_text.trim());
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(DbError::SyntaxError(format!(
            "expected a single table name after FROM, found '{}'",
            table_text.trim()
        )));
    }
    let table = db.get_table(name)?;
    let descriptor = table.descriptor();

    // Projection as column indices; `*` expands to every column
    let mut projected = Vec::new();
    for item in split_top_level(projection, b',') {
        if item == "*" {
            projected.extend(0..descriptor.columns.len());
        } else {
            projected.push(descriptor.column_index(unquote_ident(item))?);
        }
    }
    if projected.is_empty() {
        projected.extend(0..descriptor.columns.len());
    }

    let row_indices = match predicate_text {
        Some(text) => {
            let bound = predicate::parse(text)?.bind(descriptor)?;
            table.scan(|row| bound.evaluate(row))?
        }
        None => table.scan(|_| true)?,
    };

    let mut rows = Vec::with_capacity(row_indices.len());
    for &index in &row_indices {
        let bytes = table.read_row_bytes(index)?;
        rows.push(
            projected
                .iter()
                .map(|&c| descriptor.columns[c].decode_from_row(&bytes))
                .collect(),
        );
    }

    tracing::debug!(
        table = table.name(),
        matched = row_indices.len(),
        "select completed"
    );

    Ok(QueryResult::Selected(SelectResult {
        table: table.name().to_string(),
        columns: projected
            .iter()
            .map(|&c| descriptor.columns[c].name.clone())
            .collect(),
        row_indices,
        stride: table.stride(),
        rows,
    }))
}
