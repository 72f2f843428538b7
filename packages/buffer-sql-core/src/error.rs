//! Database error types.

use thiserror::Error;

use crate::types::type_id;

/// Database operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// Leading keyword of a statement is not recognised
    #[error("Unknown statement '{0}'")]
    UnknownStatement(String),

    /// Second keyword of CREATE / INSERT is not recognised
    #[error("Unknown subcommand '{subcommand}' for {statement}")]
    UnknownSubcommand {
        statement: &'static str,
        subcommand: String,
    },

    /// Table not found
    #[error("Table '{table}' not found")]
    TableNotFound { table: String },

    /// Table already exists
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// Column not found in table
    #[error("Column '{column}' not found in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Column declared twice in CREATE TABLE
    #[error("Column '{column}' declared more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// INSERT column list and value list differ in length
    #[error("Column count {columns} does not match value count {values}")]
    ColumnValueCountMismatch { columns: usize, values: usize },

    /// Declared column type (or width) has no codec
    #[error("Unsupported column type '{declared}'")]
    UnsupportedColumnType { declared: String },

    /// Literal cannot be parsed by the column codec
    #[error("Invalid literal '{literal}' for column '{column}': {reason}")]
    InvalidLiteral {
        column: String,
        literal: String,
        reason: String,
    },

    /// Value does not belong to the column's type
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// WHERE clause could not be tokenized or parsed
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Statement structure is malformed
    #[error("Syntax error: {0}")]
    SyntaxError(String),

    /// Arena or table region would overflow its fixed capacity
    #[error("Capacity exceeded in {region}: requested {requested} bytes, {available} available")]
    CapacityExceeded {
        region: String,
        requested: usize,
        available: usize,
    },

    /// Offset does not address a valid location
    #[error("Invalid offset {offset} (max: {max})")]
    InvalidOffset { offset: usize, max: usize },

    /// Arena size is unusable
    #[error("Invalid arena size {0}: must be a multiple of 4 between 12 and u32::MAX")]
    InvalidArenaSize(usize),

    /// Worker handles are only available on shared buffers
    #[error("Buffer is not shared; worker handles are unavailable")]
    BufferNotShared,

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DbError {
    /// Stable upper-snake name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DbError::UnknownStatement(_) => "NO_DEFINED_METHOD",
            DbError::UnknownSubcommand { .. } => "NO_DEFINED_SUBCOMMAND",
            DbError::TableNotFound { .. } => "TABLE_CANT_FOUND_ON_THIS_DATABASE",
            DbError::TableAlreadyExists(_) => "TABLE_ALREADY_EXISTS",
            DbError::UnknownColumn { .. } => "TABLE_HAS_NOT_COLUMN",
            DbError::DuplicateColumn { .. } => "COLUMN_ALREADY_DEFINED",
            DbError::ColumnValueCountMismatch { .. } => "COLUMN_COUNT_MUST_EQUAL_TO_VALUE_COUNT",
            DbError::UnsupportedColumnType { .. } => "TYPE_IS_UNDEFINED_FOR_FIND_OPTIONS",
            DbError::InvalidLiteral { .. } => "INVALID_LITERAL",
            DbError::TypeMismatch { .. } => "TYPE_MISMATCH",
            DbError::InvalidPredicate(_) => "INVALID_PREDICATE",
            DbError::SyntaxError(_) => "SYNTAX_ERROR",
            DbError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            DbError::InvalidOffset { .. } => "INVALID_OFFSET",
            DbError::InvalidArenaSize(_) => "INVALID_ARENA_SIZE",
            DbError::BufferNotShared => "BUFFER_NOT_SHARED",
            DbError::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Numeric discriminant derived from [`kind_name`](Self::kind_name) by the
    /// type identifier registry.
    pub fn type_tag(&self) -> u32 {
        type_id(self.kind_name())
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, DbError>;
