//! Compilation errors.

use thiserror::Error;

use crate::schema::SchemaError;

/// Errors raised while parsing or compiling a query request.
///
/// Every variant describes bad client input; nothing is ever partially
/// compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Operator '{operator}' expects {expected} value(s), got {actual}")]
    ArityError {
        operator: String,
        expected: String,
        actual: usize,
    },

    #[error("Unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    #[error("Unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    #[error("No join path from '{primary}' to '{table}'")]
    UnreachableJoin { primary: String, table: String },

    #[error("Request selects no measures, dimensions or time dimension")]
    EmptySelection,

    #[error("'{0}' is not a time dimension")]
    NotATimeDimension(String),

    #[error("Identifier listed more than once: {0}")]
    DuplicateIdentifier(String),

    #[error("Order key '{0}' is not part of the selection")]
    OrderKeyNotSelected(String),

    #[error("Unsupported sort direction: {0}")]
    UnsupportedSortDirection(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Offset requires a limit")]
    OffsetWithoutLimit,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CompileError {
    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        match self {
            CompileError::UnknownIdentifier(_)
            | CompileError::ArityError { .. }
            | CompileError::UnsupportedOperator(_)
            | CompileError::UnsupportedGranularity(_)
            | CompileError::UnreachableJoin { .. }
            | CompileError::EmptySelection
            | CompileError::NotATimeDimension(_)
            | CompileError::DuplicateIdentifier(_)
            | CompileError::OrderKeyNotSelected(_)
            | CompileError::UnsupportedSortDirection(_)
            | CompileError::InvalidDateRange(_)
            | CompileError::OffsetWithoutLimit
            | CompileError::InvalidRequest(_) => true,
        }
    }

    pub(crate) fn arity(operator: &str, expected: &str, actual: usize) -> Self {
        CompileError::ArityError {
            operator: operator.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }
}

impl From<SchemaError> for CompileError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::MeasureNotFound(id) | SchemaError::DimensionNotFound(id) => {
                CompileError::UnknownIdentifier(id)
            }
            // Construction errors never surface from a built registry.
            other => CompileError::InvalidRequest(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::InvalidRequest(err.to_string())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
