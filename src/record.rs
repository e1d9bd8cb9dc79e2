//! Fixed-width line splitting.
//!
//! Lines are sliced by byte range. A range that runs past the end of a short
//! line is truncated to the bytes that exist, and a range that starts beyond
//! the end yields an empty field. Bytes past the last delineation are ignored.

use encoding_rs::Encoding;

use crate::{delineation::Delineation, error::LoadError, io_utils};

/// Removes a trailing `\n` or `\r\n`. Padding spaces are part of the record
/// and are left alone.
pub fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

pub fn split_record<'a>(line: &'a [u8], delineations: &[Delineation]) -> Vec<&'a [u8]> {
    let line = strip_line_terminator(line);
    delineations
        .iter()
        .map(|delineation| {
            let end = delineation.end.min(line.len());
            let start = delineation.start.min(end);
            &line[start..end]
        })
        .collect()
}

/// Convenience for text already in memory.
pub fn split_str<'a>(line: &'a str, delineations: &[Delineation]) -> Vec<&'a [u8]> {
    split_record(line.as_bytes(), delineations)
}

/// Splits a raw line and decodes every field with `encoding`.
pub fn split_and_decode(
    line: &[u8],
    line_number: usize,
    delineations: &[Delineation],
    encoding: &'static Encoding,
) -> Result<Vec<String>, LoadError> {
    split_record(line, delineations)
        .into_iter()
        .zip(delineations)
        .map(|(bytes, delineation)| {
            io_utils::decode_field(bytes, encoding).ok_or_else(|| LoadError::Decode {
                line: line_number,
                column: delineation.column_name.clone(),
                encoding: encoding.name(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    fn delineations() -> Vec<Delineation> {
        [("name", 0, 10), ("valid", 10, 11), ("count", 11, 14)]
            .into_iter()
            .map(|(name, start, end)| Delineation {
                column_name: name.to_string(),
                start,
                end,
            })
            .collect()
    }

    fn texts(fields: Vec<&[u8]>) -> Vec<&str> {
        fields
            .into_iter()
            .map(|field| std::str::from_utf8(field).expect("utf8 field"))
            .collect()
    }

    #[test]
    fn splits_reference_line() {
        let fields = split_str("Foonyor   1  1\n", &delineations());
        assert_eq!(texts(fields), vec!["Foonyor   ", "1", "  1"]);
    }

    #[test]
    fn strips_crlf_but_not_padding() {
        assert_eq!(strip_line_terminator(b"ab  \r\n"), b"ab  ");
        assert_eq!(strip_line_terminator(b"ab  \n"), b"ab  ");
        assert_eq!(strip_line_terminator(b"ab  "), b"ab  ");
        assert_eq!(strip_line_terminator(b"\r"), b"");
    }

    #[test]
    fn short_lines_truncate_then_empty_trailing_fields() {
        let fields = split_str("Barzane   0-", &delineations());
        assert_eq!(texts(fields), vec!["Barzane   ", "0", "-"]);

        let fields = split_str("Bar\n", &delineations());
        assert_eq!(texts(fields), vec!["Bar", "", ""]);

        let fields = split_str("", &delineations());
        assert!(fields.iter().all(|field| field.is_empty()));
    }

    #[test]
    fn over_length_lines_ignore_trailing_bytes() {
        let fields = split_str("Quuxitude 1103EXTRA\n", &delineations());
        assert_eq!(texts(fields), vec!["Quuxitude ", "1", "103"]);
    }

    #[test]
    fn inverted_range_yields_an_empty_field() {
        let inverted = vec![Delineation {
            column_name: "bad".to_string(),
            start: 5,
            end: 2,
        }];
        let fields = split_record(b"abcdefgh", &inverted);
        assert_eq!(texts(fields), vec![""]);
        assert_eq!(inverted[0].width(), 0);
    }

    #[test]
    fn decoding_reports_offending_column() {
        let err = split_and_decode(b"abcdefghij\xff23\n", 5, &delineations(), UTF_8).unwrap_err();
        match err {
            LoadError::Decode { line, column, .. } => {
                assert_eq!(line, 5);
                assert_eq!(column, "valid");
            }
            other => panic!("expected Decode, got {other:?}"),
        }
    }

    #[test]
    fn decoding_keeps_fields_in_order() {
        let fields = split_and_decode(b"Foonyor   1  1\r\n", 1, &delineations(), UTF_8).unwrap();
        assert_eq!(fields, vec!["Foonyor   ", "1", "  1"]);
    }
}
