//! Streaming reader for column specification files.
//!
//! A specification file is delimited text: one header line, skipped without
//! inspection, then one row per column. Fields are matched to the caller's
//! field names by position, so `["width", "column_name", "data_type"]` reads
//! the width from the first field of every row.

use std::{fs::File, io::BufReader, path::Path};

use log::debug;

use crate::{
    error::LoadError,
    io_utils,
    schema::{ColumnSpec, column_specs_from_rows},
};

pub const COLUMN_NAME_FIELD: &str = "column_name";
pub const WIDTH_FIELD: &str = "width";
pub const DATA_TYPE_FIELD: &str = "data_type";

pub fn default_fieldnames() -> Vec<String> {
    vec![
        COLUMN_NAME_FIELD.to_string(),
        WIDTH_FIELD.to_string(),
        DATA_TYPE_FIELD.to_string(),
    ]
}

/// One non-header row, still as text. `row` is the 1-based line number in
/// the specification file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationRow {
    pub row: usize,
    pub column_name: String,
    pub width: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Copy)]
struct FieldPositions {
    column_name: usize,
    width: usize,
    data_type: usize,
}

impl FieldPositions {
    fn resolve(fieldnames: &[String]) -> Result<Self, LoadError> {
        let position = |wanted: &str| -> Result<usize, LoadError> {
            let mut matches = fieldnames
                .iter()
                .enumerate()
                .filter(|(_, name)| name.trim() == wanted)
                .map(|(idx, _)| idx);
            let first = matches.next().ok_or_else(|| LoadError::MalformedSpecification {
                row: 0,
                reason: format!("field names {fieldnames:?} do not include '{wanted}'"),
            })?;
            if matches.next().is_some() {
                return Err(LoadError::MalformedSpecification {
                    row: 0,
                    reason: format!("field name '{wanted}' is listed more than once"),
                });
            }
            Ok(first)
        };
        Ok(Self {
            column_name: position(COLUMN_NAME_FIELD)?,
            width: position(WIDTH_FIELD)?,
            data_type: position(DATA_TYPE_FIELD)?,
        })
    }
}

/// Lazy iterator over specification rows. The underlying file handle is owned
/// by the iterator and closed when it is dropped, whether iteration finished,
/// stopped early, or ended at an error.
pub struct SpecificationReader {
    records: csv::StringRecordsIntoIter<BufReader<File>>,
    positions: FieldPositions,
    expected_fields: usize,
    emitted: usize,
    failed: bool,
}

impl SpecificationReader {
    pub fn open(path: &Path, fieldnames: &[String], delimiter: u8) -> Result<Self, LoadError> {
        let positions = FieldPositions::resolve(fieldnames)?;
        let reader = io_utils::open_specification_reader(path, delimiter)?;
        debug!(
            "Reading specification {:?} with field names {:?}",
            path, fieldnames
        );
        Ok(Self {
            records: reader.into_records(),
            positions,
            expected_fields: fieldnames.len(),
            emitted: 0,
            failed: false,
        })
    }

    fn fail(&mut self, err: LoadError) -> Option<Result<SpecificationRow, LoadError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl Iterator for SpecificationReader {
    type Item = Result<SpecificationRow, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => {
                let row = err
                    .position()
                    .map(|pos| pos.line() as usize)
                    .unwrap_or(self.emitted + 2);
                return self.fail(LoadError::MalformedSpecification {
                    row,
                    reason: err.to_string(),
                });
            }
        };
        self.emitted += 1;
        let row = record
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(self.emitted + 1);
        if record.len() < self.expected_fields {
            return self.fail(LoadError::MalformedSpecification {
                row,
                reason: format!(
                    "expected {} field(s) but found {}",
                    self.expected_fields,
                    record.len()
                ),
            });
        }
        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        Some(Ok(SpecificationRow {
            row,
            column_name: field(self.positions.column_name),
            width: field(self.positions.width),
            data_type: field(self.positions.data_type),
        }))
    }
}

/// Reads and validates a whole specification file.
pub fn read_column_specs(
    path: &Path,
    fieldnames: &[String],
    delimiter: u8,
) -> Result<Vec<ColumnSpec>, LoadError> {
    column_specs_from_rows(SpecificationReader::open(path, fieldnames, delimiter)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn spec_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write spec");
        file
    }

    #[test]
    fn skips_header_and_preserves_order() {
        let file = spec_file("\"column name\",width,datatype\nname,10,TEXT\nvalid,1,BOOLEAN\ncount,3,INTEGER\n");
        let rows = SpecificationReader::open(file.path(), &default_fieldnames(), b',')
            .expect("open")
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].column_name, "name");
        assert_eq!(rows[0].width, "10");
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[2].data_type, "INTEGER");
        assert_eq!(rows[2].row, 4);
    }

    #[test]
    fn header_content_is_not_validated() {
        let file = spec_file("whatever\nid,4,INTEGER\n");
        let rows = SpecificationReader::open(file.path(), &default_fieldnames(), b',')
            .expect("open")
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].column_name, "id");
    }

    #[test]
    fn maps_fields_by_caller_order() {
        let file = spec_file("w,n,t\n10,name,TEXT\n");
        let fieldnames = vec![
            "width".to_string(),
            "column_name".to_string(),
            "data_type".to_string(),
        ];
        let rows = SpecificationReader::open(file.path(), &fieldnames, b',')
            .expect("open")
            .collect::<Result<Vec<_>, _>>()
            .expect("rows");
        assert_eq!(rows[0].column_name, "name");
        assert_eq!(rows[0].width, "10");
    }

    #[test]
    fn short_row_is_malformed_and_ends_iteration() {
        let file = spec_file("h1,h2,h3\nname,10,TEXT\nvalid,1\ncount,3,INTEGER\n");
        let mut reader =
            SpecificationReader::open(file.path(), &default_fieldnames(), b',').expect("open");
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        match err {
            LoadError::MalformedSpecification { row, reason } => {
                assert_eq!(row, 3);
                assert!(reason.contains("expected 3"));
            }
            other => panic!("expected MalformedSpecification, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn fieldnames_must_name_required_fields() {
        let file = spec_file("h\nname,10,TEXT\n");
        let fieldnames = vec!["column_name".to_string(), "size".to_string()];
        let err = SpecificationReader::open(file.path(), &fieldnames, b',')
            .err()
            .expect("missing width field");
        assert!(matches!(err, LoadError::MalformedSpecification { row: 0, .. }));
    }

    #[test]
    fn supports_alternate_delimiter_and_trims_fields() {
        let file = spec_file("a|b|c\n name | 10 | TEXT \n");
        let specs = read_column_specs(file.path(), &default_fieldnames(), b'|').expect("specs");
        assert_eq!(specs[0].column_name, "name");
        assert_eq!(specs[0].width, 10);
    }

    #[test]
    fn read_column_specs_surfaces_invalid_width() {
        let file = spec_file("h\nname,abc,TEXT\nvalid,1,BOOLEAN\n");
        let err = read_column_specs(file.path(), &default_fieldnames(), b',').unwrap_err();
        assert!(matches!(err, LoadError::InvalidWidth { row: 2, .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = SpecificationReader::open(&dir.path().join("nope.csv"), &default_fieldnames(), b',')
            .err()
            .expect("missing file");
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
