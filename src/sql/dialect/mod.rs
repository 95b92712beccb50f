//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting
//! - Bound parameter placeholders: `$n` (PostgreSQL/DuckDB) vs `?n` (SQLite)
//! - Case-insensitive matching: `ILIKE` vs `LOWER(..) LIKE LOWER(..)`
//! - Timestamp truncation: `DATE_TRUNC` vs `strftime`/`date` formulas
//!
//! # Usage
//!
//! ```ignore
//! use classmetrics::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! let param = dialect.placeholder(1);             // $1
//! ```

mod duckdb;
pub mod helpers;
mod postgres;
mod sqlite;

pub use duckdb::DuckDb;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use serde::{Deserialize, Serialize};

use super::expr::DatePart;
use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow PostgreSQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All supported dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Render the placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_dollar(index)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Pattern Matching
    // =========================================================================

    /// Whether this dialect has a native `ILIKE` operator.
    fn supports_ilike(&self) -> bool {
        false
    }

    // =========================================================================
    // Date/Time
    // =========================================================================

    /// Truncate a timestamp expression to the start of its `part` bucket.
    ///
    /// Default: `DATE_TRUNC('<part>', expr)`.
    fn emit_time_bucket(&self, part: DatePart, expr: TokenStream) -> TokenStream {
        helpers::emit_date_trunc(part, expr)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    DuckDb,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::DuckDb => &DuckDb,
            Dialect::Sqlite => &Sqlite,
        }
    }

    /// All dialects, in declaration order.
    pub fn all() -> [Dialect; 3] {
        [Dialect::Postgres, Dialect::DuckDb, Dialect::Sqlite]
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn placeholder(&self, index: usize) -> String {
        self.dialect().placeholder(index)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn supports_ilike(&self) -> bool {
        self.dialect().supports_ilike()
    }

    fn emit_time_bucket(&self, part: DatePart, expr: TokenStream) -> TokenStream {
        self.dialect().emit_time_bucket(part, expr)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "duckdb" => Ok(Dialect::DuckDb),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(s.to_string()),
        }
    }
}
