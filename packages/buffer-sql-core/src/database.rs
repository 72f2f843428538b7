//! Engine instance owning the arena, catalog and listeners.

use std::sync::Arc;

use crate::arena::Arena;
use crate::catalog::Catalog;
use crate::config::{BufferKind, EngineConfig, OpMode};
use crate::error::{DbError, Result};
use crate::events::{Listeners, TableCreatedEvent};
use crate::sql::{self, QueryResult};
use crate::table::{ColumnSpec, TableHandle};
use crate::types::database_tag;

/// State shared by every handle on the same engine.
#[derive(Debug)]
struct Shared {
    config: EngineConfig,
    arena: Arc<Arena>,
    catalog: Catalog,
    listeners: Listeners,
}

/// In-memory SQL engine over a single fixed-capacity arena.
///
/// All state lives in the arena and the catalog; the query front end is
/// stateless between calls. Handles obtained through
/// [`worker_handle`](Self::worker_handle) operate on the same tables.
#[derive(Debug)]
pub struct Database {
    shared: Arc<Shared>,
}

impl Database {
    /// Creates an engine with the given configuration.
    ///
    /// # Errors
    /// `ConfigError` if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        if config.op_mode() == OpMode::Isolated {
            tracing::debug!("no listening port defined; SQL engine running in isolated mode");
        }

        let arena = Arc::new(Arena::new(config.byte_length, database_tag())?);
        let listeners = Listeners::new(config.max_listeners);

        tracing::info!(
            byte_length = config.byte_length,
            buffer_kind = ?config.buffer_kind,
            rows_per_table = config.rows_per_table,
            "buffer SQL engine is running"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                arena,
                catalog: Catalog::new(),
                listeners,
            }),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Operating mode implied by the configuration.
    pub fn op_mode(&self) -> OpMode {
        self.shared.config.op_mode()
    }

    /// Backing arena.
    pub fn arena(&self) -> &Arc<Arena> {
        &self.shared.arena
    }

    /// Returns another handle on the same arena and catalog, suitable for
    /// moving to another thread.
    ///
    /// # Errors
    /// `BufferNotShared` when the engine was configured with a local buffer.
    pub fn worker_handle(&self) -> Result<Database> {
        match self.shared.config.buffer_kind {
            BufferKind::Shared => Ok(self.share()),
            BufferKind::Local => Err(DbError::BufferNotShared),
        }
    }

    fn share(&self) -> Database {
        Database {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Executes one SQL-subset statement.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        tracing::trace!(sql, "query");
        sql::execute(self, sql).inspect_err(|e| {
            tracing::warn!(error = %e, type_tag = e.type_tag(), "query failed");
        })
    }

    /// Reserves a raw block in the arena.
    pub fn reserve(&self, byte_length: usize, type_tag: u32) -> Result<usize> {
        self.shared.arena.reserve(byte_length, type_tag)
    }

    /// Creates a table with the configured per-table row capacity.
    pub fn create_table(&self, name: &str, columns: Vec<ColumnSpec>) -> Result<TableHandle> {
        self.create_table_with_capacity(name, columns, self.shared.config.rows_per_table)
    }

    /// Creates a table able to hold `row_capacity` rows and notifies
    /// table-created listeners.
    pub fn create_table_with_capacity(
        &self,
        name: &str,
        columns: Vec<ColumnSpec>,
        row_capacity: usize,
    ) -> Result<TableHandle> {
        let table =
            self.shared
                .catalog
                .create_table(&self.shared.arena, name, columns, row_capacity)?;

        let event = TableCreatedEvent {
            table: table.clone(),
            headers: Arc::clone(table.descriptor()),
            database: self.share(),
        };
        self.shared.listeners.emit(&event);
        Ok(table)
    }

    /// Looks up a table by name.
    pub fn get_table(&self, name: &str) -> Result<TableHandle> {
        self.shared.catalog.get_table(&self.shared.arena, name)
    }

    /// Table names in creation order.
    pub fn table_names(&self) -> Vec<String> {
        self.shared.catalog.table_names()
    }

    /// Number of tables.
    pub fn table_count(&self) -> usize {
        self.shared.catalog.table_count()
    }

    /// Registers a table-created listener.
    ///
    /// # Returns
    /// Number of registered listeners.
    pub fn on_table_created<F>(&self, listener: F) -> usize
    where
        F: Fn(&TableCreatedEvent) + Send + Sync + 'static,
    {
        self.shared.listeners.add(Arc::new(listener))
    }

    /// Number of registered table-created listeners.
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }
}
