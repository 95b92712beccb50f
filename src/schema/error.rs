//! Schema registry errors.

use thiserror::Error;

/// Errors raised while building or querying a [`SchemaRegistry`](super::SchemaRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Measure not found: {0}")]
    MeasureNotFound(String),

    #[error("Dimension not found: {0}")]
    DimensionNotFound(String),

    #[error("Invalid member identifier '{0}': expected '<group>.<name>' in lowercase")]
    InvalidIdentifier(String),

    #[error("Member '{0}' is registered more than once")]
    DuplicateMember(String),

    #[error("Table '{0}' is registered more than once")]
    DuplicateTable(String),

    #[error("Alias '{alias}' is used by both '{first}' and '{second}'")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("'{context}' references unregistered table '{table}'")]
    UnknownTable { context: String, table: String },

    #[error("Invalid SQL expression for '{member}': {message}")]
    InvalidExpression { member: String, message: String },

    #[error("Dimension '{0}' has a grain but is not a time dimension")]
    GrainOnNonTimeDimension(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
