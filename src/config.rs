//! Run configuration.
//!
//! A [`LoadConfig`] can be built in code, read from a YAML file, or both: the
//! CLI loads the file first and then overrides individual fields with flags.
//!
//! ```yaml
//! specification: specs/testformat1.csv
//! data: data/testformat1_2024-01-01.txt
//! fieldnames: [column_name, width, data_type]
//! recreate: false
//! on_error: skip
//! max_rows: 1000000
//! ```

use std::{fmt, fs::File, io::BufReader, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    error::LoadError, io_utils::DEFAULT_SPEC_DELIMITER, specification::default_fieldnames,
};

/// What to do with a line whose fields fail to decode or coerce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Fail the whole run on the first bad line.
    #[default]
    Abort,
    /// Log the bad line, leave it out of the batch and keep going.
    Skip,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorPolicy::Abort => f.write_str("abort"),
            ErrorPolicy::Skip => f.write_str("skip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub specification: PathBuf,
    pub data: PathBuf,
    pub fieldnames: Vec<String>,
    pub spec_delimiter: char,
    pub input_encoding: Option<String>,
    /// Overrides the table name derived from the specification file name.
    pub table_name: Option<String>,
    pub create: bool,
    pub recreate: bool,
    pub on_error: ErrorPolicy,
    /// Upper bound on rows held in memory for the single bulk insert.
    pub max_rows: Option<usize>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            specification: PathBuf::new(),
            data: PathBuf::new(),
            fieldnames: default_fieldnames(),
            spec_delimiter: char::from(DEFAULT_SPEC_DELIMITER),
            input_encoding: None,
            table_name: None,
            create: true,
            recreate: true,
            on_error: ErrorPolicy::Abort,
            max_rows: None,
        }
    }
}

impl LoadConfig {
    pub fn new(specification: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        Self {
            specification: specification.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        Ok(config)
    }

    /// The specification delimiter as a byte. The csv reader splits on a
    /// single byte, so only ASCII delimiters are accepted.
    pub fn spec_delimiter_byte(&self) -> Result<u8, LoadError> {
        u8::try_from(self.spec_delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                LoadError::Config(format!(
                    "spec_delimiter '{}' must be a single ASCII character",
                    self.spec_delimiter
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_create_and_recreate() {
        let config = LoadConfig::new("spec.csv", "data.txt");
        assert!(config.create);
        assert!(config.recreate);
        assert_eq!(config.on_error, ErrorPolicy::Abort);
        assert_eq!(config.fieldnames, vec!["column_name", "width", "data_type"]);
        assert_eq!(config.spec_delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn non_ascii_spec_delimiter_is_a_config_error() {
        let mut config = LoadConfig::new("spec.csv", "data.txt");
        config.spec_delimiter = '§';
        let err = config.spec_delimiter_byte().unwrap_err();
        assert!(matches!(err, LoadError::Config(_)));
        assert!(err.to_string().contains("'§'"));
    }

    #[test]
    fn load_merges_yaml_over_defaults() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "specification: specs/people.csv").unwrap();
        writeln!(file, "data: people.txt").unwrap();
        writeln!(file, "recreate: false").unwrap();
        writeln!(file, "on_error: skip").unwrap();
        writeln!(file, "spec_delimiter: '|'").unwrap();
        writeln!(file, "max_rows: 10").unwrap();

        let config = LoadConfig::load(file.path()).expect("load config");
        assert_eq!(config.specification, PathBuf::from("specs/people.csv"));
        assert!(config.create);
        assert!(!config.recreate);
        assert_eq!(config.on_error, ErrorPolicy::Skip);
        assert_eq!(config.spec_delimiter_byte().unwrap(), b'|');
        assert_eq!(config.max_rows, Some(10));
        assert_eq!(config.fieldnames.len(), 3);
    }

    #[test]
    fn load_rejects_unknown_policy() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "on_error: retry").unwrap();
        let err = LoadConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Parsing config YAML"));
    }
}
