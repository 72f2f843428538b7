//! Configuration loading and engine lifecycle.

use std::io::Write;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use ntest::timeout;
use tempfile::NamedTempFile;

use buffer_sql_core::arena::HEADER_BYTES;
use buffer_sql_core::config::{BufferKind, OpMode};
use buffer_sql_core::types::{database_tag, table_tag};
use buffer_sql_core::{Database, DbError, EngineConfig};

#[test]
fn test_engine_from_config_file() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"{{"byte_length": 65536, "rows_per_table": 10, "port": 8080}}"#
    )?;

    let config = EngineConfig::from_file(file.path())?;
    let db = Database::new(config)?;
    assert_eq!(db.op_mode(), OpMode::Networked);
    assert_eq!(db.arena().capacity(), 65536);
    assert_eq!(db.arena().type_tag(), database_tag());

    let table = db.query("CREATE TABLE t (id int)")?.into_table().unwrap();
    let header = db.arena().block_header(table.descriptor().cursor_offset)?;
    assert_eq!(header.type_tag, table_tag());
    assert_eq!(header.byte_length, 4 + 4 * 10);
    assert_eq!(table.descriptor().cursor_offset, HEADER_BYTES + 8);
    Ok(())
}

#[test]
#[timeout(1000)]
fn test_invalid_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{ not json").unwrap();
    assert!(matches!(
        EngineConfig::from_file(file.path()),
        Err(DbError::ConfigError(_))
    ));
    assert!(matches!(
        EngineConfig::from_file("/nonexistent/buffer-sql.json"),
        Err(DbError::ConfigError(_))
    ));
}

#[test]
#[timeout(1000)]
fn test_local_buffer_has_no_workers() {
    let db = Database::new(EngineConfig {
        byte_length: 4096,
        buffer_kind: BufferKind::Local,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(db.worker_handle().unwrap_err(), DbError::BufferNotShared);

    // The engine itself still serves queries
    db.query("CREATE TABLE t (id int(1))").unwrap();
}

#[test]
#[timeout(1000)]
fn test_table_created_listeners() {
    let db = Database::new(EngineConfig {
        byte_length: 1 << 16,
        rows_per_table: 4,
        ..Default::default()
    })
    .unwrap();

    let created = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&created);
    db.on_table_created(move |event| {
        sink.lock()
            .unwrap()
            .push((event.table.name().to_string(), event.headers.columns_field()));
    });

    db.query("CREATE TABLE a (x int, y varchar(4))").unwrap();
    db.query("CREATE TABLE b (z int)").unwrap();
    let _ = db.query("CREATE TABLE a (x int)");

    assert_eq!(
        *created.lock().unwrap(),
        vec![
            ("a".to_string(), "(x,y)".to_string()),
            ("b".to_string(), "(z)".to_string()),
        ]
    );
}

#[test]
#[timeout(1000)]
fn test_listener_may_query_engine() {
    let db = Database::new(EngineConfig {
        byte_length: 1 << 16,
        rows_per_table: 4,
        ..Default::default()
    })
    .unwrap();

    // A listener receives a handle on the engine and can issue statements
    db.on_table_created(|event| {
        if event.table.name() == "source" {
            event
                .database
                .query("CREATE TABLE audit (table_name varchar(16))")
                .unwrap();
        }
    });

    db.query("CREATE TABLE source (id int)").unwrap();
    assert_eq!(db.table_names(), vec!["source".to_string(), "audit".to_string()]);
}
