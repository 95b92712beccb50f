//! Expression AST - the core of SQL expression building.
//!
//! This module provides a strongly-typed AST for the expressions the
//! compiler emits, with exhaustive pattern matching enforced by the compiler.
//!
//! Every expression renders against a concrete [`Dialect`]: placeholders,
//! pattern matching and time buckets differ between targets.

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// BETWEEN: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },

    /// LIKE with ESCAPE: expr LIKE pattern ESCAPE escape_char
    ///
    /// With `case_insensitive`, renders `ILIKE` where the dialect has it and
    /// `LOWER(expr) LIKE LOWER(pattern)` elsewhere.
    LikeEscape {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape_char: char,
        negated: bool,
        case_insensitive: bool,
    },

    /// Bound parameter, 1-based.
    Param(usize),

    /// Timestamp truncated to the start of its bucket.
    TimeBucket { part: DatePart, expr: Box<Expr> },

    /// Raw SQL expression passed directly to output without escaping.
    ///
    /// # Security Warning
    ///
    /// **Never pass request values to this variant.** It carries registry
    /// expressions only; values are bound through [`Expr::Param`].
    Raw(String),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
}

/// Truncation unit for [`Expr::TimeBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePart {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DatePart {
    /// Unit keyword understood by `DATE_TRUNC`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatePart::Hour => "hour",
            DatePart::Day => "day",
            DatePart::Week => "week",
            DatePart::Month => "month",
            DatePart::Quarter => "quarter",
            DatePart::Year => "year",
        }
    }
}

// =============================================================================
// Expression to Tokens
// =============================================================================

impl Expr {
    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens(dialect));
                ts.space();
                ts.push(binary_op_to_token(*op));
                ts.space();
                ts.append(&right.to_tokens(dialect));
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                // Empty IN list: "x IN ()" is invalid SQL
                // "x IN ()" should be FALSE, "x NOT IN ()" should be TRUE
                if values.is_empty() {
                    ts.push(if *negated { Token::True } else { Token::False });
                } else {
                    ts.append(&expr.to_tokens(dialect));
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens(dialect));
                    }
                    ts.rparen();
                }
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                ts.append(&expr.to_tokens(dialect));
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Between).space();
                ts.append(&low.to_tokens(dialect));
                ts.space().push(Token::And).space();
                ts.append(&high.to_tokens(dialect));
            }

            Expr::LikeEscape {
                expr,
                pattern,
                escape_char,
                negated,
                case_insensitive,
            } => {
                let native_ilike = *case_insensitive && dialect.supports_ilike();
                let lower = *case_insensitive && !native_ilike;

                emit_maybe_lower(&mut ts, expr, lower, dialect);
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space()
                    .push(if native_ilike { Token::ILike } else { Token::Like })
                    .space();
                emit_maybe_lower(&mut ts, pattern, lower, dialect);
                ts.space()
                    .push(Token::Escape)
                    .space()
                    .push(Token::LitString(escape_char.to_string()));
            }

            Expr::Param(index) => {
                ts.push(Token::Placeholder(*index));
            }

            Expr::TimeBucket { part, expr } => {
                ts.append(&dialect.emit_time_bucket(*part, expr.to_tokens(dialect)));
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }

        ts
    }

    /// Render to a SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

fn emit_maybe_lower(ts: &mut TokenStream, expr: &Expr, lower: bool, dialect: Dialect) {
    if lower {
        ts.push(Token::FunctionName("LOWER".into()))
            .lparen()
            .append(&expr.to_tokens(dialect))
            .rparen();
    } else {
        ts.append(&expr.to_tokens(dialect));
    }
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Bound parameter reference.
pub fn param(index: usize) -> Expr {
    Expr::Param(index)
}

/// Truncate `expr` to the start of its `part` bucket.
pub fn time_bucket(part: DatePart, expr: Expr) -> Expr {
    Expr::TimeBucket {
        part,
        expr: Box::new(expr),
    }
}

/// Raw SQL expression (pass-through, no parsing).
///
/// # Security Warning
///
/// **Never pass request values to this function.** The SQL is not sanitized.
///
/// # Example
/// ```ignore
/// raw_sql("COUNT(DISTINCT e.user_id)")
/// ```
pub fn raw_sql(sql: &str) -> Expr {
    Expr::Raw(sql.into())
}

// =============================================================================
// Expression Builder Trait
// =============================================================================

/// Extension trait for building expressions fluently.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOperator, other: impl Into<Expr>) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other.into()),
        }
    }

    // Comparison operators
    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Ne, other)
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gt, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Gte, other)
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lt, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::Lte, other)
    }

    // Logical operators
    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    /// Case-insensitive LIKE with ESCAPE clause.
    ///
    /// # Example
    /// ```ignore
    /// // Match strings containing literal "100%"
    /// raw_sql("c.title").ilike_escape(param(1), '\\')  // bound to "%100\\%%"
    /// ```
    fn ilike_escape(self, pattern: impl Into<Expr>, escape_char: char) -> Expr {
        Expr::LikeEscape {
            expr: Box::new(self.into_expr()),
            pattern: Box::new(pattern.into()),
            escape_char,
            negated: false,
            case_insensitive: true,
        }
    }

    // IN operator
    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    // BETWEEN operator
    fn between(self, low: impl Into<Expr>, high: impl Into<Expr>) -> Expr {
        Expr::Between {
            expr: Box::new(self.into_expr()),
            low: Box::new(low.into()),
            high: Box::new(high.into()),
            negated: false,
        }
    }

    /// Alias this expression (for SELECT list).
    fn alias(self, name: &str) -> crate::sql::query::SelectExpr {
        crate::sql::query::SelectExpr {
            expr: self.into_expr(),
            alias: Some(name.into()),
        }
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
