//! PostgreSQL SQL dialect.
//!
//! PostgreSQL features used by the compiler:
//! - ANSI identifier quoting (`"`)
//! - `$n` positional parameters
//! - `ILIKE` for case-insensitive matching
//! - `DATE_TRUNC` for time buckets

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    // Uses default placeholder ($n), emit_limit_offset and emit_time_bucket

    fn supports_ilike(&self) -> bool {
        true
    }
}
