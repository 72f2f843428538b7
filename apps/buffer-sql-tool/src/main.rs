//! Command-line front end for an isolated SQL buffer engine.
//!
//! Runs statements given with `--execute`, read from `--file`, or typed on
//! standard input one per line, and prints each result.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use buffer_sql_core::config::BufferKind;
use buffer_sql_core::{Database, DbError, EngineConfig, QueryResult};

/// Command-line arguments for the SQL tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Arena capacity in bytes
    #[arg(long)]
    byte_length: Option<usize>,

    /// Rows pre-allocated for every new table
    #[arg(long)]
    rows_per_table: Option<usize>,

    /// Use a local buffer instead of a shared one
    #[arg(long)]
    local: bool,

    /// JSON configuration file; command-line options override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Statement to execute (repeatable)
    #[arg(short, long = "execute")]
    execute: Vec<String>,

    /// File of statements, one per line
    #[arg(long)]
    file: Option<PathBuf>,
}

impl Args {
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(byte_length) = self.byte_length {
            config.byte_length = byte_length;
        }
        if let Some(rows) = self.rows_per_table {
            config.rows_per_table = rows;
        }
        if self.local {
            config.buffer_kind = BufferKind::Local;
        }
        Ok(config)
    }
}

fn print_result(out: &mut impl Write, result: &QueryResult) -> io::Result<()> {
    match result {
        QueryResult::Created(table) => writeln!(
            out,
            "created table {} {} (stride {} bytes)",
            table.name(),
            table.descriptor().columns_field(),
            table.stride()
        ),
        QueryResult::Inserted(row) => writeln!(out, "inserted row {}", row),
        QueryResult::Selected(selected) => {
            writeln!(out, "row\t{}", selected.columns.join("\t"))?;
            for (index, values) in selected.row_indices.iter().zip(&selected.rows) {
                let cells: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                writeln!(out, "{}\t{}", index, cells.join("\t"))?;
            }
            writeln!(out, "({} rows)", selected.len())
        }
    }
}

fn print_error(err: &DbError) {
    eprintln!("error [{} {}]: {}", err.kind_name(), err.type_tag(), err);
}

/// Runs one statement, printing its outcome.
///
/// # Returns
/// `true` if the statement succeeded.
fn run_statement(db: &Database, out: &mut impl Write, sql: &str) -> Result<bool> {
    if sql.trim().is_empty() || sql.trim_start().starts_with("--") {
        return Ok(true);
    }
    match db.query(sql) {
        Ok(result) => {
            print_result(out, &result)?;
            Ok(true)
        }
        Err(err) => {
            print_error(&err);
            Ok(false)
        }
    }
}

/// Reads statements line by line; errors are reported and skipped.
fn run_lines(db: &Database, input: impl BufRead, out: &mut impl Write) -> Result<usize> {
    let mut failures = 0;
    for line in input.lines() {
        let line = line.context("reading statement")?;
        if !run_statement(db, out, &line)? {
            failures += 1;
        }
    }
    Ok(failures)
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config = args.engine_config()?;
    let db = Database::new(config).context("starting engine")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let scripted = !args.execute.is_empty() || args.file.is_some();
    let mut failures = 0;

    for sql in &args.execute {
        if !run_statement(&db, &mut out, sql)? {
            failures += 1;
        }
    }

    if let Some(path) = &args.file {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        failures += run_lines(&db, io::BufReader::new(file), &mut out)?;
    }

    if !scripted {
        run_lines(&db, io::stdin().lock(), &mut out)?;
    }

    out.flush()?;
    if failures > 0 {
        anyhow::bail!("{} statement(s) failed", failures);
    }
    Ok(())
}
