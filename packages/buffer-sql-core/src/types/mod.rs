//! Type identifiers and column types.
//!
//! Block headers and error kinds are tagged with a numeric identifier
//! derived from a name. The mapping is the sum of the name's UTF-16 code
//! units, so it is deterministic across processes but not collision-free:
//! two names with equal sums produce the same tag.

mod column_type;

pub use column_type::{ColumnType, Comparand, Value};

/// Maps a name to its numeric type identifier.
pub fn type_id(name: &str) -> u32 {
    name.encode_utf16()
        .fold(0u32, |acc, unit| acc.wrapping_add(u32::from(unit)))
}

/// Tag written into the arena's own header.
pub fn database_tag() -> u32 {
    type_id("BufferSQLDatabase")
}

/// Tag written into the block header of every table region.
pub fn table_tag() -> u32 {
    type_id("TABLE")
}

/// Name of the table-created notification.
pub const TABLE_CREATE_EVENT: &str = "TABLE_CREATE_EVENT";
