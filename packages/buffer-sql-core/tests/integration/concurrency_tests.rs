//! Concurrent workers on a shared buffer.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use ntest::timeout;

use buffer_sql_core::{DbError, Value};

use super::helpers::small_database;

const WORKERS: usize = 8;
const ROWS_PER_WORKER: usize = 100;

#[timeout(10000)]
#[test]
fn test_concurrent_inserts_get_disjoint_rows() {
    let db = small_database(WORKERS * ROWS_PER_WORKER);
    db.query("CREATE TABLE events (worker int(1), seq int(2), tag varchar(3))")
        .unwrap();

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|w| {
            let worker = db.worker_handle().unwrap();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..ROWS_PER_WORKER)
                    .map(|i| {
                        worker
                            .query(&format!(
                                "INSERT INTO events VALUES ({}, {}, 'w{}')",
                                w, i, w
                            ))
                            .unwrap()
                            .row_index()
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut indices = HashSet::new();
    for handle in handles {
        let rows = handle.join().unwrap();
        // Each worker sees its own rows in increasing order
        assert!(rows.windows(2).all(|pair| pair[0] < pair[1]));
        for index in rows {
            assert!(indices.insert(index), "row {} handed out twice", index);
        }
    }
    assert_eq!(indices.len(), WORKERS * ROWS_PER_WORKER);

    // Rows sharing words were written without clobbering their neighbours
    let table = db.get_table("events").unwrap();
    assert_eq!(table.row_count(), WORKERS * ROWS_PER_WORKER);
    for index in 0..table.row_count() {
        let row = table.read_row(index).unwrap();
        let Value::Int(worker) = row[0] else {
            panic!("unexpected row {:?}", row);
        };
        assert_eq!(row[2], Value::Text(format!("w{}", worker)));
    }

    for w in 0..WORKERS {
        let result = db
            .query(&format!("SELECT seq FROM events WHERE worker = {}", w))
            .unwrap()
            .into_selected()
            .unwrap();
        let seqs: Vec<Value> = (0..ROWS_PER_WORKER).map(|i| Value::Int(i as u32)).collect();
        assert_eq!(result.rows.into_iter().flatten().collect::<Vec<_>>(), seqs);
    }
}

#[timeout(10000)]
#[test]
fn test_inserts_past_capacity_fail_cleanly() {
    let capacity = 50;
    let db = small_database(capacity);
    db.query("CREATE TABLE t (id int)").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let worker = db.worker_handle().unwrap();
            thread::spawn(move || {
                let mut ok = 0usize;
                let mut full = 0usize;
                for i in 0..25 {
                    match worker.query(&format!("INSERT INTO t VALUES ({})", i)) {
                        Ok(_) => ok += 1,
                        Err(DbError::CapacityExceeded { .. }) => full += 1,
                        Err(e) => panic!("unexpected error {}", e),
                    }
                }
                (ok, full)
            })
        })
        .collect();

    let (ok, full) = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .fold((0, 0), |acc, (ok, full)| (acc.0 + ok, acc.1 + full));
    assert_eq!(ok, capacity);
    assert_eq!(full, 100 - capacity);
    assert_eq!(db.get_table("t").unwrap().row_count(), capacity);
}

#[timeout(10000)]
#[test]
fn test_concurrent_creates_and_reads() {
    let db = small_database(8);
    let handles: Vec<_> = (0..WORKERS)
        .map(|w| {
            let worker = db.worker_handle().unwrap();
            thread::spawn(move || {
                for i in 0..5 {
                    let name = format!("t{}_{}", w, i);
                    worker
                        .query(&format!("CREATE TABLE {} (id int)", name))
                        .unwrap();
                    worker
                        .query(&format!("INSERT INTO {} VALUES ({})", name, i))
                        .unwrap();
                    // Tables created by other workers are visible without locking
                    let _ = worker.table_names();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(db.table_count(), WORKERS * 5);
    let unique: HashSet<String> = db.table_names().into_iter().collect();
    assert_eq!(unique.len(), WORKERS * 5);
}
