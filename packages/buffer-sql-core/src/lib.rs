//! Lock-free in-memory relational store over a single fixed-size byte arena.
//!
//! Provides the arena and its bump allocator, the table catalog, the
//! fixed-width column codec and a small SQL front end (`CREATE TABLE`,
//! `INSERT INTO`, `SELECT ... WHERE`).

pub mod arena;
pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod sql;
pub mod table;
pub mod types;

pub use config::EngineConfig;
pub use database::Database;
pub use error::{DbError, Result};
pub use sql::{QueryResult, SelectResult};
pub use types::{ColumnType, Value};
