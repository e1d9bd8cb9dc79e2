//! Storage collaborators that receive the generated DDL and the typed rows.
//!
//! A [`Sink`] exposes the two operations the loader needs: creating the target
//! table and bulk-inserting rows into it. [`MemorySink`] keeps everything in
//! process; [`CsvSink`] persists each table as a `<table>.sql` DDL file next
//! to a `<table>.csv` row file.

use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::data::TypedRow;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    #[error("row {row} has {actual} value(s) but {expected} target column(s) were named")]
    ArityMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("writing rows for table '{table}'")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },
}

pub trait Sink {
    /// Creates `table` from `statement`. An existing table is kept when
    /// `recreate` is false and dropped first when it is true.
    fn create_table(&mut self, table: &str, statement: &str, recreate: bool)
    -> Result<(), SinkError>;

    fn insert_rows(
        &mut self,
        table: &str,
        rows: &[TypedRow],
        target_columns: &[String],
    ) -> Result<(), SinkError>;
}

fn check_arity(rows: &[TypedRow], target_columns: &[String]) -> Result<(), SinkError> {
    match rows
        .iter()
        .position(|row| row.len() != target_columns.len())
    {
        Some(idx) => Err(SinkError::ArityMismatch {
            row: idx + 1,
            expected: target_columns.len(),
            actual: rows[idx].len(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTable {
    pub statement: String,
    pub columns: Vec<String>,
    pub rows: Vec<TypedRow>,
}

#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, MemoryTable>,
    insert_calls: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls
    }
}

impl Sink for MemorySink {
    fn create_table(
        &mut self,
        table: &str,
        statement: &str,
        recreate: bool,
    ) -> Result<(), SinkError> {
        if self.tables.contains_key(table) && !recreate {
            debug!("Table '{table}' already exists; keeping it");
            return Ok(());
        }
        self.tables.insert(
            table.to_string(),
            MemoryTable {
                statement: statement.to_string(),
                ..MemoryTable::default()
            },
        );
        Ok(())
    }

    fn insert_rows(
        &mut self,
        table: &str,
        rows: &[TypedRow],
        target_columns: &[String],
    ) -> Result<(), SinkError> {
        check_arity(rows, target_columns)?;
        let entry = self
            .tables
            .get_mut(table)
            .ok_or_else(|| SinkError::UnknownTable(table.to_string()))?;
        self.insert_calls += 1;
        entry.columns = target_columns.to_vec();
        entry.rows.extend(rows.iter().cloned());
        Ok(())
    }
}

/// Directory-backed sink. NULLs are written as empty fields.
#[derive(Debug, Clone)]
pub struct CsvSink {
    root: PathBuf,
}

impl CsvSink {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| SinkError::Io {
            context: format!("Creating output directory {root:?}"),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn ddl_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.sql"))
    }

    pub fn rows_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.csv"))
    }
}

fn io_error(context: String) -> impl FnOnce(io::Error) -> SinkError {
    move |source| SinkError::Io { context, source }
}

fn is_empty_file(path: &Path) -> Result<bool, SinkError> {
    let metadata =
        fs::metadata(path).map_err(io_error(format!("Inspecting table file {path:?}")))?;
    Ok(metadata.len() == 0)
}

impl Sink for CsvSink {
    fn create_table(
        &mut self,
        table: &str,
        statement: &str,
        recreate: bool,
    ) -> Result<(), SinkError> {
        let ddl_path = self.ddl_path(table);
        let rows_path = self.rows_path(table);
        if ddl_path.exists() && !recreate {
            debug!("Table '{table}' already exists at {ddl_path:?}; keeping it");
            return Ok(());
        }
        fs::write(&ddl_path, format!("{statement};\n"))
            .map_err(io_error(format!("Writing table definition {ddl_path:?}")))?;
        File::create(&rows_path).map_err(io_error(format!("Creating table file {rows_path:?}")))?;
        info!("Created table '{table}' in {:?}", self.root);
        Ok(())
    }

    fn insert_rows(
        &mut self,
        table: &str,
        rows: &[TypedRow],
        target_columns: &[String],
    ) -> Result<(), SinkError> {
        check_arity(rows, target_columns)?;
        let rows_path = self.rows_path(table);
        if !self.ddl_path(table).exists() || !rows_path.exists() {
            return Err(SinkError::UnknownTable(table.to_string()));
        }
        let write_header = is_empty_file(&rows_path)?;
        let file = OpenOptions::new()
            .append(true)
            .open(&rows_path)
            .map_err(io_error(format!("Opening table file {rows_path:?}")))?;
        let mut writer = csv::WriterBuilder::new().from_writer(file);
        let csv_error = |source| SinkError::Csv {
            table: table.to_string(),
            source,
        };
        if write_header {
            writer.write_record(target_columns).map_err(csv_error)?;
        }
        for row in rows {
            let cells = row
                .iter()
                .map(|cell| cell.as_ref().map(|v| v.as_display()).unwrap_or_default());
            writer.write_record(cells).map_err(csv_error)?;
        }
        writer
            .flush()
            .map_err(io_error(format!("Flushing table file {rows_path:?}")))?;
        Ok(())
    }
}
