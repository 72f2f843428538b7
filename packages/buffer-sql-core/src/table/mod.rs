//! Table schema, column layout and row access.

mod column;
#[allow(clippy::module_inception)]
mod table;
pub(crate) mod validation;

pub use column::{Column, ColumnSpec};
pub use table::{TableDescriptor, TableHandle};
