//! Error taxonomy for specification parsing, coercion and loading.
//!
//! Every variant of [`LoadError`] is fatal to the run that produced it. The
//! messages carry the specification row or data line and the column involved
//! so the offending source file can be corrected.

use std::io;

use thiserror::Error;

use crate::{schema::DataType, sink::SinkError};

/// A declared type name outside `INTEGER`, `BOOLEAN` and `TEXT`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown data type '{value}' (supported: {supported})", supported = DataType::variants().join(", "))]
pub struct UnknownDataTypeError {
    pub value: String,
}

/// A field value that does not parse as its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{column}': cannot coerce '{value}' to {data_type}")]
pub struct TypeCoercionError {
    pub column: String,
    pub value: String,
    pub data_type: DataType,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed specification at row {row}: {reason}")]
    MalformedSpecification { row: usize, reason: String },

    #[error("invalid width '{value}' for column '{column}' at specification row {row}")]
    InvalidWidth {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column '{column}' of width {width} does not fit after byte {start}")]
    WidthOverflow {
        column: String,
        start: usize,
        width: usize,
    },

    #[error("column '{column}' at specification row {row}: {cause}")]
    UnknownDataType {
        row: usize,
        column: String,
        cause: UnknownDataTypeError,
    },

    #[error("data line {line}: {cause}")]
    TypeCoercion {
        line: usize,
        cause: TypeCoercionError,
    },

    #[error("data line {line}: column '{column}' is not valid {encoding}")]
    Decode {
        line: usize,
        column: String,
        encoding: &'static str,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("batch exceeds the configured limit of {limit} row(s)")]
    BatchLimitExceeded { limit: usize },

    #[error("cannot {operation} while loader is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        LoadError::Io {
            context: context.into(),
            source,
        }
    }

    /// Row-level failures are the ones an error policy may choose to skip.
    pub fn is_row_level(&self) -> bool {
        matches!(self, LoadError::TypeCoercion { .. } | LoadError::Decode { .. })
    }
}
