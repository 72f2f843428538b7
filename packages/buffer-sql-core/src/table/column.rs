//! Column definitions within a table.

use serde::Serialize;

use crate::error::Result;
use crate::types::{ColumnType, Comparand, Value};

/// Column as declared in CREATE TABLE, before layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Declared type and width
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Column placed within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type
    pub column_type: ColumnType,
    /// Slot width in bytes
    pub size: usize,
    /// Byte offset of the slot within a row
    pub begin: usize,
    /// Byte offset one past the slot within a row
    pub end: usize,
}

impl Column {
    /// Places a column of the given type at `begin`.
    pub fn new(name: String, column_type: ColumnType, begin: usize) -> Self {
        let size = column_type.width();
        Self {
            name,
            column_type,
            size,
            begin,
            end: begin + size,
        }
    }

    /// Parses literal text with this column's codec.
    pub fn parse(&self, text: &str) -> Result<Value> {
        self.column_type.parse(&self.name, text)
    }

    /// Parses a WHERE-clause literal for comparison with this column.
    pub fn parse_comparand(&self, text: &str) -> Result<Comparand> {
        self.column_type.parse_comparand(&self.name, text)
    }

    /// Encodes a value into exactly `size` bytes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        self.column_type.encode(value)
    }

    /// Decodes this column's slot out of a full row.
    pub fn decode_from_row(&self, row: &[u8]) -> Value {
        self.column_type.decode(&row[self.begin..self.end])
    }
}
