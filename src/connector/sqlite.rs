//! In-process SQLite connector.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, InterruptHandle};
use tracing::{info, warn};

use super::{ConnectorError, ConnectorResult, QueryResult, StorageConnector};
use crate::compiler::CompiledQuery;
use crate::request::ParamValue;
use crate::sql::Dialect;

/// Default bound on a single execution.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

type Rows = (Vec<String>, Vec<BTreeMap<String, serde_json::Value>>);

/// Runs SQLite-compiled queries on the blocking pool, one at a time.
pub struct SqliteConnector {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    timeout: Duration,
}

impl SqliteConnector {
    pub fn open<P: AsRef<Path>>(path: P) -> ConnectorResult<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn open_in_memory() -> ConnectorResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run setup statements (schema, fixtures) synchronously.
    pub fn execute_batch(&self, sql: &str) -> ConnectorResult<()> {
        let conn = self.conn.lock().map_err(|_| ConnectorError::Poisoned)?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

#[async_trait]
impl StorageConnector for SqliteConnector {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, query: &CompiledQuery) -> ConnectorResult<QueryResult> {
        self.check_dialect(query)?;

        let conn = Arc::clone(&self.conn);
        let sql = query.sql.clone();
        let params: Vec<Value> = query.params.iter().map(to_sqlite_value).collect();
        let started = Instant::now();

        let task = tokio::task::spawn_blocking(move || run_query(&conn, &sql, &params));
        let (columns, rows) = match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined??,
            Err(_) => {
                warn!(timeout = ?self.timeout, "query timed out, interrupting");
                self.interrupt.interrupt();
                return Err(ConnectorError::Timeout(self.timeout));
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(rows = rows.len(), elapsed_ms, "executed query");

        Ok(QueryResult {
            columns,
            row_count: rows.len(),
            rows,
            elapsed_ms,
        })
    }
}

fn run_query(conn: &Mutex<Connection>, sql: &str, params: &[Value]) -> ConnectorResult<Rows> {
    let conn = conn.lock().map_err(|_| ConnectorError::Poisoned)?;
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = BTreeMap::new();
        for (idx, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(idx)?));
        }
        out.push(record);
    }

    Ok((columns, out))
}

fn to_sqlite_value(value: &ParamValue) -> Value {
    match value {
        ParamValue::Bool(b) => Value::Integer(i64::from(*b)),
        ParamValue::Integer(i) => Value::Integer(*i),
        ParamValue::Float(f) => Value::Real(*f),
        ParamValue::Text(s) => Value::Text(s.clone()),
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
