//! Filter compilation into parameterised predicates.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::request::{DateRange, FilterClause, FilterOperator, ParamValue};
use crate::schema::DimensionDefinition;
use crate::sql::{param, raw_sql, Expr, ExprExt};

use super::error::{CompileError, CompileResult};
use super::granularity::dimension_expr;

/// Escape character carried by `contains` patterns.
pub const LIKE_ESCAPE: char = '\\';

static ISO_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})(?:[ T]([0-9]{2}:[0-9]{2}(?::[0-9]{2})?))?$")
        .expect("date pattern is valid")
});

/// Accumulates bound values and hands out their placeholders, numbered in
/// order of appearance.
#[derive(Debug, Default)]
pub struct ParamBinder {
    values: Vec<ParamValue>,
}

impl ParamBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, value: ParamValue) -> Expr {
        self.values.push(value);
        param(self.values.len())
    }

    pub fn into_values(self) -> Vec<ParamValue> {
        self.values
    }
}

/// Render one filter clause over its resolved dimension.
pub fn compile_filter(
    clause: &FilterClause,
    dimension: &DimensionDefinition,
    binder: &mut ParamBinder,
) -> CompileResult<Expr> {
    let target = dimension_expr(dimension);
    let op = clause.operator;

    let pred = match op {
        FilterOperator::Eq
        | FilterOperator::Ne
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte => {
            let value = binder.bind(single_value(clause)?.clone());
            match op {
                FilterOperator::Eq => target.eq(value),
                FilterOperator::Ne => target.ne(value),
                FilterOperator::Gt => target.gt(value),
                FilterOperator::Gte => target.gte(value),
                FilterOperator::Lt => target.lt(value),
                _ => target.lte(value),
            }
        }
        FilterOperator::In => {
            if clause.values.is_empty() {
                return Err(CompileError::arity(op.as_str(), "at least 1", 0));
            }
            let values = clause
                .values
                .iter()
                .map(|v| binder.bind(v.clone()))
                .collect();
            target.in_list(values)
        }
        FilterOperator::Contains => {
            let needle = single_value(clause)?.as_text();
            let pattern = format!("%{}%", escape_like(&needle));
            target.ilike_escape(binder.bind(ParamValue::Text(pattern)), LIKE_ESCAPE)
        }
    };

    Ok(pred)
}

/// Inclusive range over the raw timestamp of the time dimension.
///
/// A date-only upper bound covers its whole day, so it becomes an exclusive
/// bound on the following midnight. A timestamp upper bound stays inclusive.
pub fn compile_date_range(
    range: &DateRange,
    dimension: &DimensionDefinition,
    binder: &mut ParamBinder,
) -> CompileResult<Expr> {
    let (_, to) = parse_date_range(range)?;
    let target = raw_sql(&dimension.sql);
    let from = binder.bind(ParamValue::Text(range.from.clone()));

    Ok(match to {
        DateBound::Date(day) => {
            let end = day.succ_opt().ok_or_else(|| {
                CompileError::InvalidDateRange(format!("'{}' has no following day", range.to))
            })?;
            let end = binder.bind(ParamValue::Text(end.format("%Y-%m-%d").to_string()));
            target.clone().gte(from).and(target.lt(end))
        }
        DateBound::DateTime(_) => {
            let to = binder.bind(ParamValue::Text(range.to.clone()));
            target.between(from, to)
        }
    })
}

pub fn validate_date_range(range: &DateRange) -> CompileResult<()> {
    parse_date_range(range).map(|_| ())
}

/// One side of a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateBound {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DateBound {
    fn parse(s: &str) -> CompileResult<Self> {
        let invalid = || {
            CompileError::InvalidDateRange(format!(
                "'{}' is not an ISO date (YYYY-MM-DD[ HH:MM[:SS]])",
                s
            ))
        };
        let caps = ISO_DATE.captures(s).ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").map_err(|_| invalid())?;
        match caps.get(2) {
            None => Ok(DateBound::Date(date)),
            Some(time) => {
                let time = NaiveTime::parse_from_str(time.as_str(), "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(time.as_str(), "%H:%M"))
                    .map_err(|_| invalid())?;
                Ok(DateBound::DateTime(date.and_time(time)))
            }
        }
    }

    fn date(&self) -> NaiveDate {
        match self {
            DateBound::Date(d) => *d,
            DateBound::DateTime(dt) => dt.date(),
        }
    }
}

fn parse_date_range(range: &DateRange) -> CompileResult<(DateBound, DateBound)> {
    let from = DateBound::parse(&range.from)?;
    let to = DateBound::parse(&range.to)?;
    let inverted = match (from, to) {
        (DateBound::DateTime(f), DateBound::DateTime(t)) => f > t,
        _ => from.date() > to.date(),
    };
    if inverted {
        return Err(CompileError::InvalidDateRange(format!(
            "'{}' is after '{}'",
            range.from, range.to
        )));
    }
    Ok((from, to))
}

/// Escape LIKE wildcards so the value matches literally.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

fn single_value(clause: &FilterClause) -> CompileResult<&ParamValue> {
    match clause.values.as_slice() {
        [value] => Ok(value),
        values => Err(CompileError::arity(
            clause.operator.as_str(),
            "exactly 1",
            values.len(),
        )),
    }
}
