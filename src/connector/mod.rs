//! Storage connectors: execute a [`CompiledQuery`] and return its rows.
//!
//! The compiler never executes anything. Connectors own execution, including
//! concurrency, timeouts and cancellation, and never retry.

mod sqlite;

pub use sqlite::SqliteConnector;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::compiler::CompiledQuery;
use crate::sql::Dialect;

/// Errors raised while executing a compiled query.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connector runs {expected} SQL but the query was compiled for {actual}")]
    DialectMismatch { expected: Dialect, actual: Dialect },

    #[error("Query worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Connection lock poisoned")]
    Poisoned,
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Rows returned by a connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in select order.
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, serde_json::Value>>,
    pub row_count: usize,
    pub elapsed_ms: u64,
}

/// Executes compiled queries against a store.
#[async_trait]
pub trait StorageConnector: Send + Sync {
    /// Dialect this connector's store understands.
    fn dialect(&self) -> Dialect;

    async fn execute(&self, query: &CompiledQuery) -> ConnectorResult<QueryResult>;

    /// Fail fast when `query` was compiled for another dialect.
    fn check_dialect(&self, query: &CompiledQuery) -> ConnectorResult<()> {
        if query.dialect == self.dialect() {
            Ok(())
        } else {
            Err(ConnectorError::DialectMismatch {
                expected: self.dialect(),
                actual: query.dialect,
            })
        }
    }
}
