//! DuckDB SQL dialect.
//!
//! DuckDB follows PostgreSQL for everything the compiler emits:
//! `"` quoting, `$n` parameters, `ILIKE` and `DATE_TRUNC`.

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn supports_ilike(&self) -> bool {
        true
    }
}
