//! Query requests: the typed form compiled by [`Compiler`](crate::compiler::Compiler)
//! and the JSON wire format it is parsed from.
//!
//! ```json
//! {
//!   "measures": ["sessions.count"],
//!   "dimensions": ["users.role"],
//!   "filters": [{"dimension": "users.role", "operator": "eq", "values": ["student"]}],
//!   "timeDimension": {"dimension": "time.date", "granularity": "day",
//!                     "dateRange": ["2024-01-01", "2024-01-31"]},
//!   "order": [["time", "asc"]],
//!   "limit": 100
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compiler::{CompileError, CompileResult};
use crate::schema::Granularity;

/// Order key naming the bucketed time dimension.
pub const TIME_KEY: &str = "time";

// ============================================================================
// Operators and directions
// ============================================================================

/// Filter comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
            FilterOperator::Contains => "contains",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" | "equals" => Ok(FilterOperator::Eq),
            "ne" | "notequals" | "not_equals" => Ok(FilterOperator::Ne),
            "gt" => Ok(FilterOperator::Gt),
            "gte" => Ok(FilterOperator::Gte),
            "lt" => Ok(FilterOperator::Lt),
            "lte" => Ok(FilterOperator::Lte),
            "in" => Ok(FilterOperator::In),
            "contains" => Ok(FilterOperator::Contains),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Desc)
        } else {
            Err(s.to_string())
        }
    }
}

// ============================================================================
// Values
// ============================================================================

/// An untyped filter value, bound as a query parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Text form, used for date bounds and LIKE patterns.
    pub fn as_text(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Integer(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

// ============================================================================
// Request
// ============================================================================

/// One filter predicate over a dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterClause {
    pub dimension: String,
    pub operator: FilterOperator,
    pub values: Vec<ParamValue>,
}

impl FilterClause {
    pub fn new(dimension: &str, operator: FilterOperator, values: Vec<ParamValue>) -> Self {
        Self {
            dimension: dimension.to_string(),
            operator,
            values,
        }
    }
}

/// Inclusive date range over the time dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

/// Bucketing of a time dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "builders have no effect until used"]
pub struct TimeDimensionClause {
    pub dimension: String,
    pub granularity: Granularity,
    pub date_range: Option<DateRange>,
}

impl TimeDimensionClause {
    pub fn new(dimension: &str, granularity: Granularity) -> Self {
        Self {
            dimension: dimension.to_string(),
            granularity,
            date_range: None,
        }
    }

    pub fn with_date_range(mut self, from: &str, to: &str) -> Self {
        self.date_range = Some(DateRange {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    /// Member id or [`TIME_KEY`].
    pub key: String,
    pub direction: SortDirection,
}

/// A declarative analytics request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "builders have no effect until used"]
pub struct QueryRequest {
    pub measures: Vec<String>,
    pub dimensions: Vec<String>,
    pub filters: Vec<FilterClause>,
    pub time_dimension: Option<TimeDimensionClause>,
    pub order: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure(mut self, id: &str) -> Self {
        self.measures.push(id.to_string());
        self
    }

    pub fn dimension(mut self, id: &str) -> Self {
        self.dimensions.push(id.to_string());
        self
    }

    pub fn filter(mut self, clause: FilterClause) -> Self {
        self.filters.push(clause);
        self
    }

    pub fn time_dimension(mut self, clause: TimeDimensionClause) -> Self {
        self.time_dimension = Some(clause);
        self
    }

    pub fn order_by(mut self, key: &str, direction: SortDirection) -> Self {
        self.order.push(OrderItem {
            key: key.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Parse the JSON wire format.
    ///
    /// Operators, granularities and sort directions are resolved here, so an
    /// unknown keyword fails with its structured error before compilation.
    pub fn from_json(json: &str) -> CompileResult<QueryRequest> {
        let wire: WireRequest = serde_json::from_str(json)?;
        wire.into_request()
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    #[serde(default)]
    measures: Vec<String>,
    #[serde(default)]
    dimensions: Vec<String>,
    #[serde(default)]
    filters: Vec<WireFilter>,
    time_dimension: Option<WireTimeDimension>,
    /// Array form accepted for compatibility; at most one entry.
    #[serde(default)]
    time_dimensions: Vec<WireTimeDimension>,
    #[serde(default)]
    order: Vec<Vec<String>>,
    limit: Option<u64>,
    offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireFilter {
    #[serde(alias = "member")]
    dimension: String,
    operator: String,
    #[serde(default)]
    values: Vec<ParamValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTimeDimension {
    dimension: String,
    granularity: String,
    date_range: Option<Vec<String>>,
}

impl WireRequest {
    fn into_request(self) -> CompileResult<QueryRequest> {
        let filters = self
            .filters
            .into_iter()
            .map(|f| -> CompileResult<FilterClause> {
                let operator = f
                    .operator
                    .parse()
                    .map_err(CompileError::UnsupportedOperator)?;
                Ok(FilterClause {
                    dimension: f.dimension,
                    operator,
                    values: f.values,
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;

        let mut time_dimensions = self.time_dimensions;
        if let Some(td) = self.time_dimension {
            time_dimensions.insert(0, td);
        }
        if time_dimensions.len() > 1 {
            return Err(CompileError::InvalidRequest(
                "at most one time dimension is supported".into(),
            ));
        }
        let time_dimension = time_dimensions.pop().map(|td| td.into_clause()).transpose()?;

        let order = self
            .order
            .into_iter()
            .map(|item| -> CompileResult<OrderItem> {
                match item.as_slice() {
                    [key] => Ok(OrderItem {
                        key: key.clone(),
                        direction: SortDirection::Asc,
                    }),
                    [key, dir] => Ok(OrderItem {
                        key: key.clone(),
                        direction: dir.parse().map_err(CompileError::UnsupportedSortDirection)?,
                    }),
                    _ => Err(CompileError::InvalidRequest(format!(
                        "order entries are [member, direction], got {} element(s)",
                        item.len()
                    ))),
                }
            })
            .collect::<CompileResult<Vec<_>>>()?;

        Ok(QueryRequest {
            measures: self.measures,
            dimensions: self.dimensions,
            filters,
            time_dimension,
            order,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

impl WireTimeDimension {
    fn into_clause(self) -> CompileResult<TimeDimensionClause> {
        let granularity = self
            .granularity
            .parse()
            .map_err(CompileError::UnsupportedGranularity)?;

        let date_range = match self.date_range {
            None => None,
            Some(range) => match <[String; 2]>::try_from(range) {
                Ok([from, to]) => Some(DateRange { from, to }),
                Err(range) => return Err(CompileError::arity("dateRange", "exactly 2", range.len())),
            },
        };

        Ok(TimeDimensionClause {
            dimension: self.dimension,
            granularity,
            date_range,
        })
    }
}
