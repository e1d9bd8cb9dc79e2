//! Aligned plain-text rendering of typed rows for `preview`.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    data::TypedRow,
    schema::{DataType, TableSchema},
};

const NULL_MARKER: &str = "NULL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}

impl From<DataType> for Alignment {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Integer => Alignment::Right,
            DataType::Boolean | DataType::Text => Alignment::Left,
        }
    }
}

/// Renders `rows` under a `name:TYPE` header, one line per row. Integer
/// columns are right-aligned; NULL cells print as `NULL`.
pub fn render_rows(schema: &TableSchema, rows: &[TypedRow]) -> String {
    let headers = schema
        .columns
        .iter()
        .map(|spec| format!("{}:{}", spec.column_name, spec.data_type))
        .collect::<Vec<_>>();
    let alignments = schema
        .columns
        .iter()
        .map(|spec| Alignment::from(spec.data_type))
        .collect::<Vec<_>>();
    let cells = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(value) => value.as_display(),
                    None => NULL_MARKER.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    render_table(&headers, &cells, &alignments)
}

pub fn render_table(headers: &[String], rows: &[Vec<String>], alignments: &[Alignment]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(&sanitize_cell(cell)));
        }
    }

    let mut output = String::new();
    let left = vec![Alignment::Left; column_count];
    let _ = writeln!(output, "{}", format_row(headers, &widths, &left));

    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &left));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, alignments));
    }
    output
}

fn format_row(values: &[String], widths: &[usize], alignments: &[Alignment]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(widths[idx].saturating_sub(display_width(&sanitized)));
        let cell = match alignments.get(idx).copied().unwrap_or(Alignment::Left) {
            Alignment::Left => format!("{sanitized}{padding}"),
            Alignment::Right => format!("{padding}{sanitized}"),
        };
        cells.push(cell);
    }
    let mut line = cells.join(" | ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| match ch {
                    '\n' | '\r' | '\t' => ' ',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}
