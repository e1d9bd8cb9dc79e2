//! I/O utilities for specification reading, data streaming and decoding.
//!
//! All file I/O in fwf-loader flows through this module. It provides:
//!
//! - **Specification reader construction**: a `csv` reader that skips the
//!   header, tolerates ragged rows and trims fields.
//! - **Data streaming**: a buffered, forward-only line source over a file or
//!   stdin (the `-` path convention).
//! - **Encoding**: field decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Delimiters**: parsing of the specification delimiter argument.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::error::LoadError;

pub const DEFAULT_SPEC_DELIMITER: u8 = b',';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_specification_reader(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<BufReader<File>>, LoadError> {
    let file = File::open(path)
        .map_err(|err| LoadError::io(format!("Opening specification file {path:?}"), err))?;
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .trim(csv::Trim::All);
    Ok(builder.from_reader(BufReader::new(file)))
}

/// Forward-only line source. Lines are read as raw bytes so that fixed-width
/// offsets stay byte offsets regardless of the input encoding.
pub struct LineSource {
    reader: Box<dyn BufRead>,
    line_number: usize,
}

impl LineSource {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        let reader: Box<dyn BufRead> = if is_dash(path) {
            Box::new(std::io::stdin().lock())
        } else {
            Box::new(BufReader::new(File::open(path).map_err(|err| {
                LoadError::io(format!("Opening data file {path:?}"), err)
            })?))
        };
        Ok(Self::from_reader(reader))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: Read + 'static,
    {
        Self {
            reader: Box::new(BufReader::new(reader)),
            line_number: 0,
        }
    }

    /// Reads the next line into `buffer`, terminator included. Returns the
    /// 1-based line number, or `None` at end of input.
    pub fn next_line(&mut self, buffer: &mut Vec<u8>) -> Result<Option<usize>, LoadError> {
        buffer.clear();
        let read = self.reader.read_until(b'\n', buffer).map_err(|err| {
            LoadError::io(format!("Reading data line {}", self.line_number + 1), err)
        })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        Ok(Some(self.line_number))
    }
}

/// Decodes a field, returning `None` when the bytes are not valid in the
/// given encoding.
pub fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn line_source_counts_lines_and_keeps_terminators() {
        let mut source = LineSource::from_reader(Cursor::new(b"ab\r\ncd\nef".to_vec()));
        let mut buffer = Vec::new();
        assert_eq!(source.next_line(&mut buffer).unwrap(), Some(1));
        assert_eq!(buffer, b"ab\r\n");
        assert_eq!(source.next_line(&mut buffer).unwrap(), Some(2));
        assert_eq!(buffer, b"cd\n");
        assert_eq!(source.next_line(&mut buffer).unwrap(), Some(3));
        assert_eq!(buffer, b"ef");
        assert_eq!(source.next_line(&mut buffer).unwrap(), None);
    }

    #[test]
    fn decode_field_rejects_invalid_utf8() {
        assert_eq!(decode_field(b"caf\xc3\xa9", UTF_8).as_deref(), Some("café"));
        assert_eq!(decode_field(b"\xff\xfe", UTF_8), None);
    }

    #[test]
    fn decode_field_honours_single_byte_encodings() {
        let latin1 = resolve_encoding(Some("windows-1252")).unwrap();
        assert_eq!(decode_field(b"caf\xe9", latin1).as_deref(), Some("café"));
    }

    #[test]
    fn resolve_encoding_rejects_unknown_labels() {
        assert!(resolve_encoding(Some("klingon")).is_err());
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
    }

    #[test]
    fn parse_delimiter_accepts_named_tokens() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }
}
