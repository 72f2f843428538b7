//! Table-created notifications.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::database::Database;
use crate::table::{TableDescriptor, TableHandle};
use crate::types::TABLE_CREATE_EVENT;

/// Emitted once for every successful `CREATE TABLE`.
pub struct TableCreatedEvent {
    /// Handle to the new table
    pub table: TableHandle,
    /// Descriptor of the new table
    pub headers: Arc<TableDescriptor>,
    /// Engine that created the table
    pub database: Database,
}

/// Callback invoked for each table-created event.
pub type TableCreatedListener = Arc<dyn Fn(&TableCreatedEvent) + Send + Sync>;

/// Synchronous listener list.
pub(crate) struct Listeners {
    listeners: RwLock<Vec<TableCreatedListener>>,
    max_listeners: usize,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.read().len())
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

impl Listeners {
    pub(crate) fn new(max_listeners: usize) -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            max_listeners,
        }
    }

    /// Adds a listener; warns once the count passes `max_listeners`.
    pub(crate) fn add(&self, listener: TableCreatedListener) -> usize {
        let mut listeners = self.listeners.write();
        listeners.push(listener);
        let count = listeners.len();
        if self.max_listeners > 0 && count > self.max_listeners {
            tracing::warn!(
                count,
                max_listeners = self.max_listeners,
                "possible listener leak: more table-created listeners than configured maximum"
            );
        }
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Calls every listener in registration order.
    ///
    /// The list is cloned first so a listener may register further listeners
    /// or create tables without deadlocking.
    pub(crate) fn emit(&self, event: &TableCreatedEvent) {
        let snapshot: Vec<TableCreatedListener> = self.listeners.read().clone();
        tracing::info!(
            event = TABLE_CREATE_EVENT,
            table = event.table.name(),
            listeners = snapshot.len(),
            "table created"
        );
        for listener in snapshot {
            listener(event);
        }
    }
}
