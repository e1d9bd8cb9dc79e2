//! Typed values and field coercion.
//!
//! Coercion dispatch is keyed by [`DataType`]: each variant maps to a plain
//! function from the raw field text to an optional [`Value`]. `None` is a SQL
//! NULL and is only produced for blank INTEGER and BOOLEAN fields.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{TypeCoercionError, UnknownDataTypeError},
    schema::{ColumnSpec, DataType},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// One coerced data line, aligned by position with the column specs.
pub type TypedRow = Vec<Option<Value>>;

/// Conversion failure before the column is known; [`coerce_field`] attaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue;

pub type Converter = fn(&str) -> Result<Option<Value>, InvalidValue>;

const TRUE_TOKENS: &[&str] = &["1", "t", "true", "y", "yes"];
const FALSE_TOKENS: &[&str] = &["0", "f", "false", "n", "no"];

impl DataType {
    pub fn converter(&self) -> Converter {
        match self {
            DataType::Integer => parse_integer,
            DataType::Boolean => parse_boolean,
            DataType::Text => parse_text,
        }
    }
}

/// Looks up the conversion function for a declared type name.
pub fn converter_for(name: &str) -> Result<Converter, UnknownDataTypeError> {
    DataType::from_str(name).map(|data_type| data_type.converter())
}

fn parse_integer(raw: &str) -> Result<Option<Value>, InvalidValue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(|parsed| Some(Value::Integer(parsed)))
        .map_err(|_| InvalidValue)
}

fn parse_boolean(raw: &str) -> Result<Option<Value>, InvalidValue> {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return Ok(None);
    }
    if TRUE_TOKENS.contains(&lowered.as_str()) {
        Ok(Some(Value::Boolean(true)))
    } else if FALSE_TOKENS.contains(&lowered.as_str()) {
        Ok(Some(Value::Boolean(false)))
    } else {
        Err(InvalidValue)
    }
}

fn parse_text(raw: &str) -> Result<Option<Value>, InvalidValue> {
    Ok(Some(Value::Text(raw.to_string())))
}

pub fn coerce_field(raw: &str, spec: &ColumnSpec) -> Result<Option<Value>, TypeCoercionError> {
    (spec.data_type.converter())(raw).map_err(|InvalidValue| TypeCoercionError {
        column: spec.column_name.clone(),
        value: raw.to_string(),
        data_type: spec.data_type,
    })
}

/// Coerces split fields column by column, stopping at the first failure.
pub fn coerce_row<S>(fields: &[S], specs: &[ColumnSpec]) -> Result<TypedRow, TypeCoercionError>
where
    S: AsRef<str>,
{
    specs
        .iter()
        .enumerate()
        .map(|(idx, spec)| {
            let raw = fields.get(idx).map(|s| s.as_ref()).unwrap_or("");
            coerce_field(raw, spec)
        })
        .collect()
}
