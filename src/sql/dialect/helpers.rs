//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use super::super::expr::DatePart;
use super::super::token::{Token, TokenStream};

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Placeholders
// =============================================================================

/// `$1`, `$2`, ...
/// Used by: Postgres, DuckDB
pub fn placeholder_dollar(index: usize) -> String {
    format!("${}", index)
}

/// `?1`, `?2`, ...
/// Used by: SQLite
pub fn placeholder_question(index: usize) -> String {
    format!("?{}", index)
}

// =============================================================================
// Pagination
// =============================================================================

/// Emit LIMIT ... OFFSET ... (standard SQL).
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(i64::try_from(lim).unwrap_or(i64::MAX)));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(i64::try_from(off).unwrap_or(i64::MAX)));
    }

    ts
}

// =============================================================================
// Time Buckets
// =============================================================================

/// `DATE_TRUNC('<part>', expr)`.
/// Used by: Postgres, DuckDB
pub fn emit_date_trunc(part: DatePart, expr: TokenStream) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName("DATE_TRUNC".into()))
        .lparen()
        .push(Token::LitString(part.as_str().into()))
        .comma()
        .space()
        .append(&expr)
        .rparen();
    ts
}

/// Bucket start computed with SQLite's date functions.
///
/// Buckets render as ISO text: `YYYY-MM-DD` for day and coarser grains,
/// `YYYY-MM-DD HH:00:00` for hours. Weeks start on Monday.
pub fn emit_time_bucket_sqlite(part: DatePart, expr: TokenStream) -> TokenStream {
    let mut ts = TokenStream::new();
    match part {
        DatePart::Hour => strftime(&mut ts, "%Y-%m-%d %H:00:00", &expr),
        DatePart::Day => {
            ts.push(Token::FunctionName("DATE".into()))
                .lparen()
                .append(&expr)
                .rparen();
        }
        DatePart::Week => {
            // 'weekday 0' moves forward to Sunday (or stays), then back to Monday.
            ts.push(Token::FunctionName("DATE".into()))
                .lparen()
                .append(&expr)
                .comma()
                .space()
                .push(Token::LitString("weekday 0".into()))
                .comma()
                .space()
                .push(Token::LitString("-6 days".into()))
                .rparen();
        }
        DatePart::Month => strftime(&mut ts, "%Y-%m-01", &expr),
        DatePart::Quarter => {
            ts.push(Token::FunctionName("PRINTF".into()))
                .lparen()
                .push(Token::LitString("%s-%02d-01".into()))
                .comma()
                .space();
            strftime(&mut ts, "%Y", &expr);
            ts.comma().space().push(Token::Raw("((CAST(".into()));
            strftime(&mut ts, "%m", &expr);
            ts.push(Token::Raw(" AS INTEGER) - 1) / 3) * 3 + 1".into()))
                .rparen();
        }
        DatePart::Year => strftime(&mut ts, "%Y-01-01", &expr),
    }
    ts
}

fn strftime(ts: &mut TokenStream, format: &str, expr: &TokenStream) {
    ts.push(Token::FunctionName("STRFTIME".into()))
        .lparen()
        .push(Token::LitString(format.into()))
        .comma()
        .space()
        .append(expr)
        .rparen();
}
