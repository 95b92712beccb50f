//! Compiled query output.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::request::ParamValue;
use crate::sql::{Dialect, Query};

/// What an output column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Measure,
    Dimension,
    Time,
}

/// Output column descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub alias: String,
    pub member: String,
    pub role: ColumnRole,
}

/// One rendered SELECT list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectItem {
    pub expr: String,
    pub alias: String,
}

/// A compiled request: the full SQL plus its clauses rendered separately,
/// and the values to bind to its placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<ParamValue>,
    pub dialect: Dialect,
    pub select: Vec<SelectItem>,
    /// FROM target and joins.
    pub from: String,
    /// Empty when there are no filters.
    pub predicate: String,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub columns: Vec<OutputColumn>,
    #[serde(skip)]
    pub(crate) query: Query,
}

impl CompiledQuery {
    /// The query AST the SQL was rendered from.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Number of placeholders in the SQL.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// SHA-256 over (dialect, sql, params), as 64 lowercase hex characters.
    ///
    /// Stable for identical compilations, so it can key an external cache.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        compute_hash(&(self.dialect, &self.sql, &self.params))
    }
}

fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
