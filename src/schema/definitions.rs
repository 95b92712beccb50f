//! Measure, dimension and table definitions.
//!
//! Definitions are immutable once registered. Their SQL is trusted text,
//! qualified with the owning table's alias, and checked by the registry
//! builder before the registry is handed out.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Kinds
// ============================================================================

/// How a measure aggregates its source rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::Count => "count",
            AggregationKind::Sum => "sum",
            AggregationKind::Avg => "avg",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
        }
    }
}

/// Value kind of a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    String,
    Number,
    Time,
}

impl DimensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::String => "string",
            DimensionKind::Number => "number",
            DimensionKind::Time => "time",
        }
    }
}

/// Time-bucket size applied to a time dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    /// The unrecognised keyword.
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// A physical table and the alias every expression uses for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub name: String,
    pub alias: String,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

/// A named aggregation over one source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "builders have no effect until used"]
pub struct MeasureDefinition {
    pub id: String,
    pub table: String,
    pub aggregation: AggregationKind,
    pub sql: String,
    pub description: String,
}

impl MeasureDefinition {
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        aggregation: AggregationKind,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            aggregation,
            sql: sql.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named grouping/filtering key drawn from one source table.
///
/// Time dimensions may carry an intrinsic grain: selected as a plain
/// dimension they render truncated to it, while a time dimension clause
/// re-buckets the same raw timestamp at the requested granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "builders have no effect until used"]
pub struct DimensionDefinition {
    pub id: String,
    pub table: String,
    pub kind: DimensionKind,
    pub sql: String,
    pub grain: Option<Granularity>,
    pub description: String,
}

impl DimensionDefinition {
    pub fn new(
        id: impl Into<String>,
        table: impl Into<String>,
        kind: DimensionKind,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            table: table.into(),
            kind,
            sql: sql.into(),
            grain: None,
            description: String::new(),
        }
    }

    /// A time dimension over `sql`, truncated to `grain` when selected directly.
    pub fn time(
        id: impl Into<String>,
        table: impl Into<String>,
        sql: impl Into<String>,
        grain: Granularity,
    ) -> Self {
        Self::new(id, table, DimensionKind::Time, sql).with_grain(grain)
    }

    pub fn with_grain(mut self, grain: Granularity) -> Self {
        self.grain = Some(grain);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_time(&self) -> bool {
        self.kind == DimensionKind::Time
    }
}
