//! Table descriptors and handles.
//!
//! Each table owns one arena block laid out as
//! `[row cursor: u32][row 0][row 1]...`. The row cursor is a byte offset
//! local to the row region. It starts at 0 and grows by one stride per
//! insert, never past the region length.

use std::sync::Arc;

use serde::Serialize;

use crate::arena::Arena;
use crate::error::{DbError, Result};
use crate::types::{table_tag, Value};

use super::column::{Column, ColumnSpec};
use super::validation;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Bytes reserved in front of the row region for the row cursor.
const ROW_CURSOR_BYTES: usize = 4;

/// Immutable description of a table and where it lives in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<Column>,
    /// Bytes per row (sum of column widths)
    pub stride: usize,
    /// Number of rows the region can hold
    pub row_capacity: usize,
    /// Length of the row region in bytes
    pub byte_length: usize,
    /// Arena offset of the first row
    pub byte_offset: usize,
    /// Arena offset of the row cursor word
    pub cursor_offset: usize,
}

impl TableDescriptor {
    /// Lays out the columns and reserves the table's block in the arena.
    pub(crate) fn allocate(
        arena: &Arena,
        name: String,
        specs: Vec<ColumnSpec>,
        row_capacity: usize,
    ) -> Result<Self> {
        let (columns, stride) = validation::layout_columns(&name, specs)?;
        let byte_length = validation::region_length(&name, stride, row_capacity)?;
        let block_length =
            byte_length
                .checked_add(ROW_CURSOR_BYTES)
                .ok_or_else(|| DbError::CapacityExceeded {
                    region: "arena".to_string(),
                    requested: usize::MAX,
                    available: arena.remaining(),
                })?;

        let cursor_offset = arena.reserve(block_length, table_tag())?;

        Ok(Self {
            name,
            columns,
            stride,
            row_capacity,
            byte_length,
            byte_offset: cursor_offset + ROW_CURSOR_BYTES,
            cursor_offset,
        })
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns `true` if the table declares `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Looks up a column by name.
    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DbError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Position of a column in declaration order.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DbError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    /// Column list rendered as `(a,b,c)`.
    pub fn columns_field(&self) -> String {
        format!("({})", self.column_names().join(","))
    }
}

/// View of one table bound to the arena holding its rows.
#[derive(Debug, Clone)]
pub struct TableHandle {
    descriptor: Arc<TableDescriptor>,
    arena: Arc<Arena>,
}

impl TableHandle {
    pub(crate) fn new(descriptor: Arc<TableDescriptor>, arena: Arc<Arena>) -> Self {
        Self { descriptor, arena }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Shared descriptor of this table.
    pub fn descriptor(&self) -> &Arc<TableDescriptor> {
        &self.descriptor
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.descriptor.columns
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.descriptor.stride
    }

    pub fn column_names(&self) -> Vec<String> {
        self.descriptor.column_names()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.descriptor.has_column(name)
    }

    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.descriptor.get_column(name)
    }

    /// Current row cursor: the byte offset one past the last allocated row.
    pub fn next_row_offset(&self) -> usize {
        self.arena.load_u32(self.descriptor.cursor_offset) as usize
    }

    /// Number of rows allocated so far.
    pub fn row_count(&self) -> usize {
        self.next_row_offset() / self.descriptor.stride
    }

    /// Claims the next row slot.
    ///
    /// # Returns
    /// Byte offset of the new row, local to the table's row region.
    ///
    /// # Errors
    /// `CapacityExceeded` once the pre-allocated region is full.
    pub fn allocate_row(&self) -> Result<usize> {
        let d = &self.descriptor;
        self.arena
            .bounded_fetch_add(d.cursor_offset, d.stride as u32, d.byte_length as u32)
            .map(|previous| previous as usize)
            .map_err(|current| DbError::CapacityExceeded {
                region: format!("table '{}'", d.name),
                requested: d.stride,
                available: d.byte_length - current as usize,
            })
    }

    /// Writes pre-encoded column slots into the row at `row_offset`.
    ///
    /// `slots` pairs each column with bytes of exactly its width. Columns
    /// not listed keep their zero fill.
    pub fn write_row(&self, row_offset: usize, slots: &[(&Column, Vec<u8>)]) -> Result<()> {
        let base = self.row_base(row_offset)?;
        for (column, bytes) in slots {
            debug_assert_eq!(bytes.len(), column.size);
            self.arena.write_bytes(base + column.begin, bytes)?;
        }
        Ok(())
    }

    /// Decodes one column of the row at `row_offset`.
    pub fn read_column(&self, row_offset: usize, column: &Column) -> Result<Value> {
        let base = self.row_base(row_offset)?;
        let bytes = self.arena.read_bytes(base + column.begin, column.size)?;
        Ok(column.column_type.decode(&bytes))
    }

    /// Raw bytes of the row at `row_index`.
    pub fn read_row_bytes(&self, row_index: usize) -> Result<Vec<u8>> {
        let row_offset = self.row_offset(row_index)?;
        let base = self.row_base(row_offset)?;
        self.arena.read_bytes(base, self.descriptor.stride)
    }

    /// Decodes every column of the row at `row_index`.
    pub fn read_row(&self, row_index: usize) -> Result<Vec<Value>> {
        let bytes = self.read_row_bytes(row_index)?;
        Ok(self
            .descriptor
            .columns
            .iter()
            .map(|c| c.decode_from_row(&bytes))
            .collect())
    }

    /// Indices of allocated rows for which `matches` returns `true`.
    ///
    /// Rows are visited from index 0 up to the row cursor observed at the
    /// start of the scan. Results are in ascending row order.
    pub fn scan<F>(&self, matches: F) -> Result<Vec<usize>>
    where
        F: Fn(&[u8]) -> bool + Send + Sync,
    {
        let row_count = self.row_count();

        #[cfg(feature = "parallel")]
        {
            let hits: Result<Vec<Option<usize>>> = (0..row_count)
                .into_par_iter()
                .map(|index| {
                    let bytes = self.read_row_bytes(index)?;
                    Ok(matches(&bytes).then_some(index))
                })
                .collect();
            Ok(hits?.into_iter().flatten().collect())
        }

        #[cfg(not(feature = "parallel"))]
        {
            let stride = self.descriptor.stride;
            let mut row = vec![0u8; stride];
            let mut hits = Vec::new();
            for index in 0..row_count {
                self.arena
                    .read_into(self.descriptor.byte_offset + index * stride, &mut row)?;
                if matches(&row) {
                    hits.push(index);
                }
            }
            Ok(hits)
        }
    }

    /// Local byte offset of the row at `row_index`.
    pub fn row_offset(&self, row_index: usize) -> Result<usize> {
        row_index
            .checked_mul(self.descriptor.stride)
            .filter(|&offset| offset < self.descriptor.byte_length)
            .ok_or(DbError::InvalidOffset {
                offset: row_index,
                max: self.descriptor.row_capacity,
            })
    }

    /// Arena offset of a row given its local offset.
    fn row_base(&self, row_offset: usize) -> Result<usize> {
        let d = &self.descriptor;
        if row_offset % d.stride != 0 || row_offset >= d.byte_length {
            return Err(DbError::InvalidOffset {
                offset: row_offset,
                max: d.byte_length,
            });
        }
        Ok(d.byte_offset + row_offset)
    }
}
