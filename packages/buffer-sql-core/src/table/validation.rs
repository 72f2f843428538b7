//! Layout and validation of table schemas.

use std::collections::HashSet;

use super::column::{Column, ColumnSpec};
use crate::error::{DbError, Result};

/// Places columns left to right and returns them with the row stride.
///
/// # Errors
/// - `SyntaxError` if no columns are declared
/// - `DuplicateColumn` if a name repeats
/// - `CapacityExceeded` if the stride overflows
pub(crate) fn layout_columns(table: &str, specs: Vec<ColumnSpec>) -> Result<(Vec<Column>, usize)> {
    if specs.is_empty() {
        return Err(DbError::SyntaxError(format!(
            "table '{}' must declare at least one column",
            table
        )));
    }

    let mut seen = HashSet::with_capacity(specs.len());
    let mut columns = Vec::with_capacity(specs.len());
    let mut offset = 0usize;

    for spec in specs {
        if !seen.insert(spec.name.clone()) {
            return Err(DbError::DuplicateColumn {
                table: table.to_string(),
                column: spec.name,
            });
        }
        let width = spec.column_type.width();
        let column = Column::new(spec.name, spec.column_type, offset);
        offset = offset.checked_add(width).ok_or_else(|| DbError::CapacityExceeded {
            region: format!("table '{}' stride", table),
            requested: usize::MAX,
            available: offset,
        })?;
        columns.push(column);
    }

    Ok((columns, offset))
}

/// Bytes needed for `rows` rows of `stride` bytes.
pub(crate) fn region_length(table: &str, stride: usize, rows: usize) -> Result<usize> {
    stride.checked_mul(rows).ok_or_else(|| DbError::CapacityExceeded {
        region: format!("table '{}'", table),
        requested: usize::MAX,
        available: u32::MAX as usize,
    })
}
