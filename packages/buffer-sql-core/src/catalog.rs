//! Ordered catalog of table descriptors.
//!
//! Readers take lock-free snapshots of the descriptor list through
//! `ArcSwap`. Writers are serialised by a mutex and publish a new list with
//! copy-on-write, so a `CREATE TABLE` racing another never loses an entry
//! and a reader never observes a half-built list.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::arena::Arena;
use crate::error::{DbError, Result};
use crate::table::{ColumnSpec, TableDescriptor, TableHandle};

/// Catalog of every table known to one engine.
#[derive(Debug)]
pub struct Catalog {
    /// Published descriptor list in creation order
    tables: ArcSwap<Vec<Arc<TableDescriptor>>>,
    /// Serialises catalog writers
    write_lock: Mutex<()>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            tables: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a table and reserves its rows in `arena`.
    ///
    /// The name check, the arena reservation and the publication happen
    /// under the writer lock, so a rejected table never consumes arena space.
    ///
    /// # Errors
    /// - `TableAlreadyExists` if the name is taken
    /// - `DuplicateColumn` / `SyntaxError` for an invalid column list
    /// - `CapacityExceeded` if the arena cannot hold the table
    pub fn create_table(
        &self,
        arena: &Arc<Arena>,
        name: &str,
        columns: Vec<ColumnSpec>,
        row_capacity: usize,
    ) -> Result<TableHandle> {
        let _guard = self.write_lock.lock();

        let current = self.tables.load_full();
        if current.iter().any(|t| t.name == name) {
            return Err(DbError::TableAlreadyExists(name.to_string()));
        }

        let descriptor = Arc::new(TableDescriptor::allocate(
            arena,
            name.to_string(),
            columns,
            row_capacity,
        )?);

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(Arc::clone(&descriptor));
        self.tables.store(Arc::new(next));

        tracing::debug!(
            table = name,
            stride = descriptor.stride,
            byte_offset = descriptor.byte_offset,
            byte_length = descriptor.byte_length,
            "table registered"
        );
        Ok(TableHandle::new(descriptor, Arc::clone(arena)))
    }

    /// Looks up a table by name.
    pub fn get_table(&self, arena: &Arc<Arena>, name: &str) -> Result<TableHandle> {
        self.descriptor(name)
            .map(|d| TableHandle::new(d, Arc::clone(arena)))
    }

    /// Descriptor of the table called `name`.
    pub fn descriptor(&self, name: &str) -> Result<Arc<TableDescriptor>> {
        self.tables
            .load()
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| DbError::TableNotFound {
                table: name.to_string(),
            })
    }

    /// Table names in creation order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.load().iter().map(|t| t.name.clone()).collect()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.load().len()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
