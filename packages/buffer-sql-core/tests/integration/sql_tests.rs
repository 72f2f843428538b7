//! SQL statements end to end.

use anyhow::Result;
use ntest::timeout;

use buffer_sql_core::{Database, DbError, EngineConfig, QueryResult, SelectResult, Value};

use super::helpers::{create_persons, small_database};

fn select(db: &Database, sql: &str) -> Result<SelectResult> {
    db.query(sql)?
        .into_selected()
        .ok_or_else(|| anyhow::anyhow!("not a SELECT result: {}", sql))
}

fn matching(db: &Database, sql: &str) -> Vec<usize> {
    select(db, sql).unwrap().row_indices
}

/// Table `nums` with rows n = 1..=5 labelled one..five.
fn numbers_table() -> Database {
    let db = small_database(16);
    db.query("CREATE TABLE nums (n int(2), label varchar(8))").unwrap();
    for (n, label) in [(1, "one"), (2, "two"), (3, "three"), (4, "four"), (5, "five")] {
        db.query(&format!("INSERT INTO nums VALUES ({}, '{}')", n, label))
            .unwrap();
    }
    db
}

#[test]
fn test_persons_scenario() -> Result<()> {
    let db = small_database(16);
    create_persons(&db)?;

    let first = db.query("INSERT INTO Persons (1,'lname','fname')")?;
    assert_eq!(first.row_index(), Some(0));

    let second =
        db.query("INSERT INTO Persons (LastName,FirstName) VALUES ('lname2','fname2')")?;
    assert_eq!(second.row_index(), Some(1));

    let all = select(&db, "SELECT * FROM Persons")?;
    assert_eq!(all.columns, vec!["PersonID", "LastName", "FirstName"]);
    assert_eq!(
        all.rows,
        vec![
            vec![
                Value::Int(1),
                Value::Text("lname".to_string()),
                Value::Text("fname".to_string())
            ],
            vec![
                Value::Int(0),
                Value::Text("lname2".to_string()),
                Value::Text("fname2".to_string())
            ],
        ]
    );

    let filtered = select(&db, "SELECT * FROM Persons WHERE PersonID >= 1")?;
    assert_eq!(filtered.row_indices, vec![0]);
    assert_eq!(filtered.row_offsets(), vec![0]);
    Ok(())
}

#[test]
#[timeout(1000)]
fn test_create_table_result() {
    let db = small_database(4);
    let table = db
        .query("create table Items (id int(1), name varchar(3));")
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(table.name(), "Items");
    assert_eq!(table.stride(), 4);
    assert_eq!(db.table_names(), vec!["Items".to_string()]);

    let err = db.query("CREATE TABLE Items (id int)").unwrap_err();
    assert_eq!(err, DbError::TableAlreadyExists("Items".to_string()));
}

#[test]
#[timeout(1000)]
fn test_projection() {
    let db = numbers_table();
    let result = select(&db, "SELECT label, n FROM nums WHERE n = 2").unwrap();
    assert_eq!(result.table, "nums");
    assert_eq!(result.columns, vec!["label", "n"]);
    assert_eq!(
        result.rows,
        vec![vec![Value::Text("two".to_string()), Value::Int(2)]]
    );
}

#[test]
#[timeout(1000)]
fn test_every_operator() {
    let db = numbers_table();
    let cases: &[(&str, &[usize])] = &[
        ("n = 3", &[2]),
        ("n <> 3", &[0, 1, 3, 4]),
        ("n != 3", &[0, 1, 3, 4]),
        ("n < 3", &[0, 1]),
        ("n <= 3", &[0, 1, 2]),
        ("n > 3", &[3, 4]),
        ("n >= 3", &[2, 3, 4]),
        ("3 < n", &[3, 4]),
        ("3 >= n", &[0, 1, 2]),
        ("label = 'three'", &[2]),
        ("label > 'm'", &[0, 1, 2]),
        ("n = 9", &[]),
    ];
    for (predicate, expected) in cases {
        let sql = format!("SELECT * FROM nums WHERE {}", predicate);
        assert_eq!(matching(&db, &sql), expected.to_vec(), "{}", predicate);
    }
}

#[test]
#[timeout(1000)]
fn test_and_binds_tighter_than_or() {
    let db = numbers_table();
    assert_eq!(
        matching(&db, "SELECT * FROM nums WHERE n = 1 OR n = 2 AND label = 'x'"),
        vec![0]
    );
    assert_eq!(
        matching(&db, "SELECT * FROM nums WHERE (n = 1 OR n = 2) AND label = 'two'"),
        vec![1]
    );
    assert_eq!(
        matching(&db, "SELECT * FROM nums WHERE n > 1 and n < 5 or n = 5"),
        vec![1, 2, 3, 4]
    );
}

#[test]
#[timeout(1000)]
fn test_column_to_column_comparison() {
    let db = small_database(8);
    db.query("CREATE TABLE pairs (a int, b int)").unwrap();
    db.query("INSERT INTO pairs VALUES (1, 2)").unwrap();
    db.query("INSERT INTO pairs VALUES (3, 3)").unwrap();
    db.query("INSERT INTO pairs VALUES (5, 4)").unwrap();
    assert_eq!(matching(&db, "SELECT * FROM pairs WHERE a < b"), vec![0]);
    assert_eq!(matching(&db, "SELECT * FROM pairs WHERE a = b"), vec![1]);
}

#[test]
#[timeout(1000)]
fn test_inserts_are_selected_in_order() {
    let db = small_database(64);
    db.query("CREATE TABLE log (seq int, msg varchar(16))").unwrap();
    for i in 0..50 {
        let result = db
            .query(&format!("INSERT INTO log (seq, msg) VALUES ({}, 'm,{}')", i, i))
            .unwrap();
        assert_eq!(result.row_index(), Some(i));
    }

    let all = select(&db, "SELECT seq, msg FROM log").unwrap();
    assert_eq!(all.row_indices, (0..50).collect::<Vec<_>>());
    for (i, row) in all.rows.iter().enumerate() {
        assert_eq!(row[0], Value::Int(i as u32));
        assert_eq!(row[1], Value::Text(format!("m,{}", i)));
    }
}

#[test]
#[timeout(1000)]
fn test_unknown_names() {
    let db = small_database(4);
    create_persons(&db).unwrap();

    assert_eq!(
        db.query("SELECT UnknownCol FROM Persons").unwrap_err(),
        DbError::UnknownColumn {
            table: "Persons".to_string(),
            column: "UnknownCol".to_string()
        }
    );
    assert!(matches!(
        db.query("SELECT * FROM Persons WHERE Age > 3"),
        Err(DbError::UnknownColumn { .. })
    ));
    assert!(matches!(
        db.query("INSERT INTO Persons (Age) VALUES (3)"),
        Err(DbError::UnknownColumn { .. })
    ));
    assert_eq!(
        db.get_table("Nope").unwrap_err(),
        DbError::TableNotFound {
            table: "Nope".to_string()
        }
    );
    assert!(matches!(
        db.query("SELECT * FROM Nope"),
        Err(DbError::TableNotFound { .. })
    ));
}

#[test]
#[timeout(1000)]
fn test_unknown_statements() {
    let db = small_database(4);
    assert_eq!(
        db.query("DROP TABLE Persons").unwrap_err(),
        DbError::UnknownStatement("DROP".to_string())
    );
    assert_eq!(
        db.query("CREATE INDEX idx").unwrap_err(),
        DbError::UnknownSubcommand {
            statement: "CREATE",
            subcommand: "INDEX".to_string()
        }
    );
    assert!(matches!(
        db.query("INSERT Persons VALUES (1)"),
        Err(DbError::UnknownSubcommand {
            statement: "INSERT",
            ..
        })
    ));
    assert!(matches!(
        db.query("SELECT * Persons"),
        Err(DbError::SyntaxError(_))
    ));
}

#[test]
#[timeout(1000)]
fn test_rejected_insert_leaves_no_row() {
    let db = small_database(4);
    create_persons(&db).unwrap();
    let table = db.get_table("Persons").unwrap();

    assert_eq!(
        db.query("INSERT INTO Persons (PersonID, LastName) VALUES (1)")
            .unwrap_err(),
        DbError::ColumnValueCountMismatch {
            columns: 2,
            values: 1
        }
    );
    assert!(matches!(
        db.query("INSERT INTO Persons VALUES ('abc', 'a', 'b')"),
        Err(DbError::InvalidLiteral { .. })
    ));
    assert!(matches!(
        db.query("INSERT INTO Persons (LastName, LastName) VALUES ('a', 'b')"),
        Err(DbError::DuplicateColumn { .. })
    ));
    assert_eq!(table.row_count(), 0);
}

#[test]
#[timeout(1000)]
fn test_malformed_predicates() {
    let db = numbers_table();
    for predicate in ["", "n >", "n = 1 AND", "(n = 1", "1 = 1", "label = 'open"] {
        let sql = format!("SELECT * FROM nums WHERE {}", predicate);
        assert!(
            matches!(db.query(&sql), Err(DbError::InvalidPredicate(_))),
            "{}",
            sql
        );
    }
    assert!(matches!(
        db.query("SELECT * FROM nums WHERE n = 'many'"),
        Err(DbError::InvalidLiteral { .. })
    ));
}

#[test]
#[timeout(1000)]
fn test_int_predicates_accept_any_number() {
    let db = numbers_table();
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE n < 70000"), vec![0, 1, 2, 3, 4]);
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE n > -1"), vec![0, 1, 2, 3, 4]);
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE n = -1"), Vec::<usize>::new());
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE n < 2.5"), vec![0, 1]);
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE 2.5 < n"), vec![2, 3, 4]);
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE n <> 3.5"), vec![0, 1, 2, 3, 4]);

    // INSERT still enforces the column width
    assert!(matches!(
        db.query("INSERT INTO nums VALUES (70000, 'big')"),
        Err(DbError::InvalidLiteral { .. })
    ));
    assert!(matches!(
        db.query("INSERT INTO nums VALUES (-1, 'neg')"),
        Err(DbError::InvalidLiteral { .. })
    ));
}

#[test]
#[timeout(1000)]
fn test_text_predicates_are_not_truncated() {
    let db = numbers_table();
    // label is varchar(8): the stored value is 'three', never 'threeXXX'
    assert_eq!(
        matching(&db, "SELECT * FROM nums WHERE label = 'threeXXXXXX'"),
        Vec::<usize>::new()
    );
    assert_eq!(matching(&db, "SELECT * FROM nums WHERE label = 'three'"), vec![2]);
}

#[test]
#[timeout(1000)]
fn test_doubled_quotes_escape_in_insert_and_where() -> Result<()> {
    let db = small_database(4);
    db.query("CREATE TABLE people (id int, name varchar(16))")?;
    db.query("INSERT INTO people VALUES (1, 'O''Brien')")?;
    db.query("INSERT INTO people VALUES (2, 'Obrien')")?;

    let found = select(&db, "SELECT name FROM people WHERE name = 'O''Brien'")?;
    assert_eq!(found.row_indices, vec![0]);
    assert_eq!(found.rows, vec![vec![Value::Text("O'Brien".to_string())]]);

    let found = select(&db, "SELECT id FROM people WHERE name <> 'O''Brien' AND id > 0")?;
    assert_eq!(found.row_indices, vec![1]);
    Ok(())
}

#[test]
#[timeout(1000)]
fn test_nul_in_varchar_is_rejected() {
    let db = small_database(4);
    db.query("CREATE TABLE s (name varchar(8))").unwrap();
    let table = db.get_table("s").unwrap();

    let sql = format!("INSERT INTO s VALUES ('a{}')", '\0');
    assert!(matches!(db.query(&sql), Err(DbError::InvalidLiteral { .. })));
    assert_eq!(table.row_count(), 0);
}

#[test]
#[timeout(1000)]
fn test_table_capacity_exceeded() {
    let db = small_database(2);
    db.query("CREATE TABLE t (id int)").unwrap();
    db.query("INSERT INTO t VALUES (1)").unwrap();
    db.query("INSERT INTO t VALUES (2)").unwrap();

    let err = db.query("INSERT INTO t VALUES (3)").unwrap_err();
    assert!(matches!(err, DbError::CapacityExceeded { .. }));
    assert_eq!(matching(&db, "SELECT * FROM t"), vec![0, 1]);
}

#[test]
#[timeout(1000)]
fn test_arena_capacity_exceeded() {
    let db = Database::new(EngineConfig {
        byte_length: 4096,
        rows_per_table: 100,
        ..Default::default()
    })
    .unwrap();

    db.query("CREATE TABLE small (id int)").unwrap();
    let err = db.query("CREATE TABLE big (name varchar(255))").unwrap_err();
    assert!(matches!(err, DbError::CapacityExceeded { .. }));
    assert_eq!(db.table_count(), 1);
    assert!(db.get_table("big").is_err());
}

#[test]
#[timeout(1000)]
fn test_query_results_are_typed() {
    let db = small_database(2);
    let created = db.query("CREATE TABLE t (id int)").unwrap();
    assert!(matches!(created, QueryResult::Created(_)));
    assert_eq!(created.row_index(), None);

    let inserted = db.query("INSERT INTO t (id) VALUES (7)").unwrap();
    assert!(matches!(inserted, QueryResult::Inserted(0)));
    assert!(inserted.into_selected().is_none());
}
