//! Column descriptors, declared data types, and table schema generation.
//!
//! This module owns the [`DataType`] enum (the three declarable column types),
//! [`ColumnSpec`] (one validated row of the specification file), and the
//! schema generator that renders the `name TYPE` fragment and the
//! `CREATE TABLE` statement handed to the sink.
//!
//! ## Responsibilities
//!
//! - Width and data type validation for specification rows
//! - Order-preserving schema fragment rendering
//! - Table name derivation from the specification file name
//! - YAML persistence of the derived [`TableSchema`] via `serde_yaml`

use std::{
    collections::HashSet,
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    delineation::{Delineation, DelineationMapper},
    error::{LoadError, UnknownDataTypeError},
    specification::SpecificationRow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Integer,
    Boolean,
    Text,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Boolean => "BOOLEAN",
            DataType::Text => "TEXT",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["INTEGER", "BOOLEAN", "TEXT"]
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = UnknownDataTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "INTEGER" => Ok(DataType::Integer),
            "BOOLEAN" => Ok(DataType::Boolean),
            "TEXT" => Ok(DataType::Text),
            _ => Err(UnknownDataTypeError {
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub column_name: String,
    pub width: usize,
    pub data_type: DataType,
}

impl ColumnSpec {
    /// Validates one specification row. The width must be a positive integer
    /// and the data type one of [`DataType::variants`].
    pub fn from_row(row: &SpecificationRow) -> Result<Self, LoadError> {
        let width = parse_width(&row.width).ok_or_else(|| LoadError::InvalidWidth {
            row: row.row,
            column: row.column_name.clone(),
            value: row.width.clone(),
        })?;
        let data_type =
            DataType::from_str(&row.data_type).map_err(|cause| LoadError::UnknownDataType {
                row: row.row,
                column: row.column_name.clone(),
                cause,
            })?;
        Ok(ColumnSpec {
            column_name: row.column_name.clone(),
            width,
            data_type,
        })
    }
}

fn parse_width(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|width| *width > 0)
}

/// Validates rows in declaration order, stopping at the first failure, then
/// rejects empty specifications and duplicate column names.
pub fn column_specs_from_rows<I>(rows: I) -> Result<Vec<ColumnSpec>, LoadError>
where
    I: IntoIterator<Item = Result<SpecificationRow, LoadError>>,
{
    let mut specs = Vec::new();
    let mut seen = HashSet::new();
    let mut last_row = 1;
    let mut record_width: usize = 0;
    for row in rows {
        let row = row?;
        last_row = row.row;
        if row.column_name.is_empty() {
            return Err(LoadError::MalformedSpecification {
                row: row.row,
                reason: "column name cannot be empty".to_string(),
            });
        }
        if !seen.insert(row.column_name.clone()) {
            return Err(LoadError::MalformedSpecification {
                row: row.row,
                reason: format!("duplicate column name '{}'", row.column_name),
            });
        }
        let spec = ColumnSpec::from_row(&row)?;
        record_width = record_width
            .checked_add(spec.width)
            .ok_or_else(|| LoadError::InvalidWidth {
                row: row.row,
                column: row.column_name.clone(),
                value: row.width.clone(),
            })?;
        specs.push(spec);
    }
    if specs.is_empty() {
        return Err(LoadError::MalformedSpecification {
            row: last_row,
            reason: "specification declares no columns".to_string(),
        });
    }
    Ok(specs)
}

/// Renders `name TYPE` pairs joined by commas, in declaration order.
pub fn table_schema(specs: &[ColumnSpec]) -> String {
    specs
        .iter()
        .map(|spec| format!("{} {}", spec.column_name, spec.data_type))
        .join(",")
}

pub fn create_table_statement(table_schema: &str, table_name: &str) -> String {
    format!("CREATE TABLE {table_name} ({table_schema})")
}

/// The specification file name with its extension stripped.
pub fn table_name_from_path(path: &Path) -> Result<String, LoadError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.to_string())
        .ok_or_else(|| LoadError::Config(format!("cannot derive a table name from {path:?}")))
}

/// Everything derived from a specification file, ready to be persisted or
/// handed to the loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
    pub delineations: Vec<Delineation>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnSpec>) -> Result<Self, LoadError> {
        let delineations = DelineationMapper::new(&columns).collect::<Result<Vec<_>, _>>()?;
        Ok(TableSchema {
            table: table.into(),
            columns,
            delineations,
        })
    }

    pub fn table_schema(&self) -> String {
        table_schema(&self.columns)
    }

    pub fn create_table_statement(&self) -> String {
        create_table_statement(&self.table_schema(), &self.table)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|spec| spec.column_name.clone())
            .collect()
    }

    /// Total declared record width in bytes.
    pub fn record_width(&self) -> usize {
        self.delineations.last().map(|d| d.end).unwrap_or(0)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating schema file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing schema YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening schema file {path:?}"))?;
        let reader = BufReader::new(file);
        let schema: TableSchema =
            serde_yaml::from_reader(reader).context("Parsing schema YAML")?;
        let expected = DelineationMapper::new(&schema.columns)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Validating columns in {path:?}"))?;
        ensure!(
            expected == schema.delineations,
            "Schema file {path:?} has delineations that do not match its column widths"
        );
        Ok(schema)
    }
}
