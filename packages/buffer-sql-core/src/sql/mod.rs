//! SQL-subset front end.
//!
//! Statements are dispatched on their leading keyword:
//! - `CREATE TABLE name (col type[(size)], ...)`
//! - `INSERT INTO name [(cols)] [VALUES] (vals)`
//! - `SELECT cols|* FROM name [WHERE predicate]`
//!
//! Keywords are case-insensitive and a trailing `;` is ignored.

mod ddl;
mod dml;
pub mod predicate;
mod select;
mod text;

use serde::Serialize;

use crate::database::Database;
use crate::error::{DbError, Result};
use crate::table::TableHandle;
use crate::types::Value;

pub use ddl::parse_create_table;

/// Outcome of a statement.
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// CREATE TABLE produced this table
    Created(TableHandle),
    /// INSERT wrote the row with this 0-based index
    Inserted(usize),
    /// SELECT matched these rows
    Selected(SelectResult),
}

impl QueryResult {
    /// Row index of an INSERT result.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            QueryResult::Inserted(index) => Some(*index),
            _ => None,
        }
    }

    /// Rows of a SELECT result.
    pub fn into_selected(self) -> Option<SelectResult> {
        match self {
            QueryResult::Selected(result) => Some(result),
            _ => None,
        }
    }

    /// Table handle of a CREATE TABLE result.
    pub fn into_table(self) -> Option<TableHandle> {
        match self {
            QueryResult::Created(table) => Some(table),
            _ => None,
        }
    }
}

/// Rows matched by a SELECT, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectResult {
    /// Table scanned
    pub table: String,
    /// Projected column names
    pub columns: Vec<String>,
    /// Matching row indices, ascending
    pub row_indices: Vec<usize>,
    /// Byte stride of the table, for converting indices to row offsets
    pub stride: usize,
    /// Projected values, one entry per matching row
    pub rows: Vec<Vec<Value>>,
}

impl SelectResult {
    /// Local byte offsets of the matching rows.
    pub fn row_offsets(&self) -> Vec<usize> {
        self.row_indices.iter().map(|i| i * self.stride).collect()
    }

    pub fn len(&self) -> usize {
        self.row_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_indices.is_empty()
    }
}

/// Executes one statement against `db`.
pub(crate) fn execute(db: &Database, sql: &str) -> Result<QueryResult> {
    let statement = sql.trim();
    let statement = statement.strip_suffix(';').unwrap_or(statement).trim_end();
    let (keyword, rest) = text::split_keyword(statement);

    match keyword.to_ascii_uppercase().as_str() {
        "CREATE" => ddl::create(db, rest),
        "INSERT" => dml::insert(db, rest),
        "SELECT" => select::select(db, rest),
        _ => Err(DbError::UnknownStatement(keyword.to_string())),
    }
}
