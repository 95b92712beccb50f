//! Time bucketing of time dimensions.

use crate::schema::{DimensionDefinition, Granularity};
use crate::sql::{raw_sql, time_bucket, DatePart, Expr};

use super::error::{CompileError, CompileResult};

pub fn date_part(granularity: Granularity) -> DatePart {
    match granularity {
        Granularity::Hour => DatePart::Hour,
        Granularity::Day => DatePart::Day,
        Granularity::Week => DatePart::Week,
        Granularity::Month => DatePart::Month,
        Granularity::Quarter => DatePart::Quarter,
        Granularity::Year => DatePart::Year,
    }
}

/// Value expression of a dimension as selected, filtered or grouped.
///
/// Time dimensions with an intrinsic grain come out truncated to it.
pub fn dimension_expr(dimension: &DimensionDefinition) -> Expr {
    let raw = raw_sql(&dimension.sql);
    match dimension.grain {
        Some(grain) => time_bucket(date_part(grain), raw),
        None => raw,
    }
}

/// The raw timestamp of `dimension` truncated to `granularity`.
///
/// The requested granularity replaces any intrinsic grain.
pub fn bucket_expr(dimension: &DimensionDefinition, granularity: Granularity) -> CompileResult<Expr> {
    if !dimension.is_time() {
        return Err(CompileError::NotATimeDimension(dimension.id.clone()));
    }
    Ok(time_bucket(date_part(granularity), raw_sql(&dimension.sql)))
}
