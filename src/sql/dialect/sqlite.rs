//! SQLite SQL dialect.
//!
//! SQLite differs from PostgreSQL in three places the compiler touches:
//! - `?n` numbered parameters
//! - no `ILIKE`; case-insensitive matching lowers both sides
//! - no `DATE_TRUNC`; buckets are built from `date`/`strftime`

use super::helpers;
use super::SqlDialect;
use crate::sql::expr::DatePart;
use crate::sql::token::TokenStream;

/// SQLite SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, index: usize) -> String {
        helpers::placeholder_question(index)
    }

    fn emit_time_bucket(&self, part: DatePart, expr: TokenStream) -> TokenStream {
        helpers::emit_time_bucket_sqlite(part, expr)
    }
}
