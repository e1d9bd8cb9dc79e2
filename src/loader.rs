//! Record loading: specification to schema, data file to typed rows, rows to
//! the sink.
//!
//! [`RecordLoader`] walks a fixed sequence of states:
//!
//! ```text
//! NotStarted --prepare--> SchemaReady --load--> Loading --> Completed
//!      |                                           |
//!      +------------------> Failed <---------------+
//! ```
//!
//! The data file is read once, forward only. Accepted rows accumulate in a
//! single in-memory batch which is handed to the sink in one `insert_rows`
//! call after the last line; a run that fails never inserts anything. The
//! batch can be capped with [`LoadConfig::max_rows`].

use std::path::Path;

use encoding_rs::Encoding;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    config::{ErrorPolicy, LoadConfig},
    data::{TypedRow, coerce_row},
    error::LoadError,
    io_utils::{self, LineSource},
    record::{split_and_decode, strip_line_terminator},
    schema::{TableSchema, table_name_from_path},
    sink::Sink,
    specification::read_column_specs,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
    NotStarted,
    SchemaReady,
    Loading,
    Completed,
    Failed,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::NotStarted => "not started",
            LoadState::SchemaReady => "schema ready",
            LoadState::Loading => "loading",
            LoadState::Completed => "completed",
            LoadState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: String,
    pub lines_read: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub blank_lines: usize,
}

/// Reads the specification named by `config` and derives the table schema.
pub fn build_table_schema(config: &LoadConfig) -> Result<TableSchema, LoadError> {
    let specs = read_column_specs(
        &config.specification,
        &config.fieldnames,
        config.spec_delimiter_byte()?,
    )?;
    let table = match &config.table_name {
        Some(name) => name.clone(),
        None => table_name_from_path(&config.specification)?,
    };
    TableSchema::new(table, specs)
}

pub fn resolve_encoding(config: &LoadConfig) -> Result<&'static Encoding, LoadError> {
    io_utils::resolve_encoding(config.input_encoding.as_deref())
        .map_err(|err| LoadError::Config(err.to_string()))
}

/// Splits, decodes and coerces one raw line.
pub fn parse_line(
    line: &[u8],
    line_number: usize,
    schema: &TableSchema,
    encoding: &'static Encoding,
) -> Result<TypedRow, LoadError> {
    let fields = split_and_decode(line, line_number, &schema.delineations, encoding)?;
    coerce_row(&fields, &schema.columns).map_err(|cause| LoadError::TypeCoercion {
        line: line_number,
        cause,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Row { line: usize, row: TypedRow },
    Blank { line: usize },
}

/// Streams typed rows out of a data file, one line at a time. Row-level
/// errors leave the stream usable; I/O errors end it.
pub struct RowStream<'a> {
    source: LineSource,
    schema: &'a TableSchema,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
    lines_read: usize,
    finished: bool,
}

impl<'a> RowStream<'a> {
    pub fn open(
        path: &Path,
        schema: &'a TableSchema,
        encoding: &'static Encoding,
    ) -> Result<Self, LoadError> {
        Ok(Self::new(LineSource::open(path)?, schema, encoding))
    }

    pub fn new(source: LineSource, schema: &'a TableSchema, encoding: &'static Encoding) -> Self {
        Self {
            source,
            schema,
            encoding,
            buffer: Vec::with_capacity(schema.record_width() + 2),
            lines_read: 0,
            finished: false,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}

impl Iterator for RowStream<'_> {
    type Item = Result<ParsedLine, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let line = match self.source.next_line(&mut self.buffer) {
            Ok(Some(line)) => line,
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };
        self.lines_read = line;
        if strip_line_terminator(&self.buffer).is_empty() {
            return Some(Ok(ParsedLine::Blank { line }));
        }
        Some(
            parse_line(&self.buffer, line, self.schema, self.encoding)
                .map(|row| ParsedLine::Row { line, row }),
        )
    }
}

pub struct RecordLoader {
    config: LoadConfig,
    state: LoadState,
    schema: Option<TableSchema>,
    encoding: &'static Encoding,
}

impl RecordLoader {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            config,
            state: LoadState::NotStarted,
            schema: None,
            encoding: encoding_rs::UTF_8,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn schema(&self) -> Option<&TableSchema> {
        self.schema.as_ref()
    }

    /// Runs both phases against `sink`.
    pub fn run<S>(&mut self, sink: &mut S) -> Result<LoadReport, LoadError>
    where
        S: Sink + ?Sized,
    {
        self.prepare(sink)?;
        self.load(sink)
    }

    /// Derives the schema and, unless creation is disabled, has the sink
    /// create the target table.
    pub fn prepare<S>(&mut self, sink: &mut S) -> Result<&TableSchema, LoadError>
    where
        S: Sink + ?Sized,
    {
        self.expect_state(LoadState::NotStarted, "prepare")?;
        match self.derive_and_create(sink) {
            Ok(schema) => {
                self.state = LoadState::SchemaReady;
                let schema = self.schema.insert(schema);
                Ok(&*schema)
            }
            Err(err) => {
                self.state = LoadState::Failed;
                Err(err)
            }
        }
    }

    fn derive_and_create<S>(&mut self, sink: &mut S) -> Result<TableSchema, LoadError>
    where
        S: Sink + ?Sized,
    {
        self.encoding = resolve_encoding(&self.config)?;
        let schema = build_table_schema(&self.config)?;
        let statement = schema.create_table_statement();
        info!(
            "Derived schema for table '{}' from {:?}: {} column(s), {} byte(s) per record",
            schema.table,
            self.config.specification,
            schema.columns.len(),
            schema.record_width()
        );
        debug!("{statement}");
        if self.config.create {
            sink.create_table(&schema.table, &statement, self.config.recreate)?;
        } else {
            info!("Table creation disabled; assuming '{}' exists", schema.table);
        }
        Ok(schema)
    }

    /// Streams the data file and flushes accepted rows in a single insert.
    pub fn load<S>(&mut self, sink: &mut S) -> Result<LoadReport, LoadError>
    where
        S: Sink + ?Sized,
    {
        self.expect_state(LoadState::SchemaReady, "load")?;
        let Some(schema) = self.schema.as_ref() else {
            return Err(LoadError::InvalidState {
                operation: "load",
                state: self.state.as_str(),
            });
        };
        self.state = LoadState::Loading;
        let result = load_rows(&self.config, schema, self.encoding, sink);
        self.state = match &result {
            Ok(_) => LoadState::Completed,
            Err(_) => LoadState::Failed,
        };
        result
    }

    fn expect_state(&self, expected: LoadState, operation: &'static str) -> Result<(), LoadError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LoadError::InvalidState {
                operation,
                state: self.state.as_str(),
            })
        }
    }
}

fn load_rows<S>(
    config: &LoadConfig,
    schema: &TableSchema,
    encoding: &'static Encoding,
    sink: &mut S,
) -> Result<LoadReport, LoadError>
where
    S: Sink + ?Sized,
{
    info!(
        "Loading {:?} into table '{}' (on error: {})",
        config.data, schema.table, config.on_error
    );
    let mut stream = RowStream::open(&config.data, schema, encoding)?;
    let mut batch: Vec<TypedRow> = Vec::new();
    let mut report = LoadReport {
        table: schema.table.clone(),
        ..LoadReport::default()
    };

    for parsed in stream.by_ref() {
        match parsed {
            Ok(ParsedLine::Row { row, .. }) => {
                if let Some(limit) = config.max_rows {
                    if batch.len() >= limit {
                        return Err(LoadError::BatchLimitExceeded { limit });
                    }
                }
                batch.push(row);
            }
            Ok(ParsedLine::Blank { line }) => {
                debug!("Skipping blank data line {line}");
                report.blank_lines += 1;
            }
            Err(err) if err.is_row_level() && config.on_error == ErrorPolicy::Skip => {
                warn!("Skipping {err}");
                report.rows_skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    report.lines_read = stream.lines_read();

    if batch.is_empty() {
        info!("No rows to insert into '{}'", schema.table);
    } else {
        sink.insert_rows(&schema.table, &batch, &schema.column_names())?;
        report.rows_loaded = batch.len();
    }
    info!(
        "Loaded {} row(s) into '{}' from {} line(s) ({} skipped, {} blank)",
        report.rows_loaded,
        report.table,
        report.lines_read,
        report.rows_skipped,
        report.blank_lines
    );
    Ok(report)
}
