//! Engine configuration.
//!
//! Defaults match an isolated, shared-buffer engine with a 100 MB arena.
//! A configuration can also be read from a JSON document; absent keys take
//! their default values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::arena::HEADER_BYTES;
use crate::error::{DbError, Result};

/// Kind of backing memory for the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BufferKind {
    /// Arena may be handed to other workers through worker handles
    #[default]
    Shared,
    /// Arena is private to the engine instance that created it
    Local,
}

/// How the engine is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpMode {
    /// No listening port; queries come only from in-process callers
    Isolated,
    /// A port was configured for an external front end
    Networked,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Listening port for an external front end (None = isolated mode)
    pub port: Option<u16>,
    /// Total arena capacity in bytes
    pub byte_length: usize,
    /// Shared or local backing memory
    pub buffer_kind: BufferKind,
    /// Row capacity pre-allocated for every new table
    pub rows_per_table: usize,
    /// Listener count above which a warning is logged
    pub max_listeners: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: None,
            byte_length: 100_000_000,
            buffer_kind: BufferKind::Shared,
            rows_per_table: 100_000,
            max_listeners: 11,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operating mode implied by the presence of a port.
    pub fn op_mode(&self) -> OpMode {
        match self.port {
            Some(_) => OpMode::Networked,
            None => OpMode::Isolated,
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DbError::ConfigError(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DbError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Checks that the values describe a usable engine.
    pub fn validate(&self) -> Result<()> {
        if self.byte_length < HEADER_BYTES
            || self.byte_length % 4 != 0
            || self.byte_length > u32::MAX as usize
        {
            return Err(DbError::ConfigError(format!(
                "byte_length {} must be a multiple of 4 between {} and {}",
                self.byte_length,
                HEADER_BYTES,
                u32::MAX
            )));
        }
        if self.rows_per_table == 0 {
            return Err(DbError::ConfigError(
                "rows_per_table must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
