//! Query assembly: select list, joins, predicate, grouping, ordering and
//! pagination, in that order.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::request::{FilterClause, QueryRequest, SortDirection, TIME_KEY};
use crate::schema::{DimensionDefinition, MeasureDefinition, SchemaRegistry, SchemaResult};
use crate::sql::{col, raw_sql, Expr, ExprExt, OrderByExpr, Query, SelectExpr};

use super::error::{CompileError, CompileResult};
use super::filter::{compile_date_range, compile_filter, validate_date_range, ParamBinder};
use super::granularity::{bucket_expr, dimension_expr};
use super::output::{ColumnRole, CompiledQuery, OutputColumn, SelectItem};
use super::resolver::TableResolver;
use super::CompileOptions;

/// Output alias of a member: dots become underscores.
pub fn output_alias(member: &str) -> String {
    member.replace('.', "_")
}

/// Every name the request mentions, resolved against the registry.
struct Resolved<'r, 'q> {
    measures: Vec<&'r MeasureDefinition>,
    dimensions: Vec<&'r DimensionDefinition>,
    filters: Vec<(&'q FilterClause, &'r DimensionDefinition)>,
    time: Option<ResolvedTime<'r>>,
}

struct ResolvedTime<'r> {
    dimension: &'r DimensionDefinition,
    bucket: Expr,
}

struct Column {
    select: SelectExpr,
    output: OutputColumn,
}

pub(crate) fn assemble(
    registry: &SchemaRegistry,
    options: &CompileOptions,
    request: &QueryRequest,
) -> CompileResult<CompiledQuery> {
    let dialect = options.dialect;

    // All validation happens before anything is rendered.
    let resolved = resolve(registry, request)?;
    let columns = select_columns(&resolved, request)?;
    let order_by = order_by(request, &columns)?;
    let (limit, offset) = pagination(request, options)?;

    let required = required_tables(&resolved);
    let plan = TableResolver::new(registry).resolve(&required)?;

    let mut binder = ParamBinder::new();
    let mut predicates = Vec::with_capacity(resolved.filters.len() + 1);
    for (clause, dimension) in &resolved.filters {
        predicates.push(compile_filter(clause, dimension, &mut binder)?);
    }
    if let (Some(td), Some(time)) = (&request.time_dimension, &resolved.time) {
        if let Some(range) = &td.date_range {
            predicates.push(compile_date_range(range, time.dimension, &mut binder)?);
        }
    }

    let group_by = group_by(&resolved);

    let select: Vec<SelectExpr> = columns.iter().map(|c| c.select.clone()).collect();
    let mut query = plan.apply(Query::new().select(select));
    for pred in predicates {
        query = query.filter(pred);
    }
    query = query.group_by(group_by).order_by(order_by);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    if let Some(offset) = offset {
        query = query.offset(offset);
    }

    let sql = query.to_sql(dialect);
    let params = binder.into_values();
    debug!(
        dialect = %dialect,
        primary = %plan.primary,
        joins = plan.joins.len(),
        params = params.len(),
        "compiled query"
    );

    Ok(CompiledQuery {
        sql,
        params,
        dialect,
        select: query
            .select
            .iter()
            .map(|s| SelectItem {
                expr: s.expr.to_sql(dialect),
                alias: s.alias.clone().unwrap_or_default(),
            })
            .collect(),
        from: query.from_tokens(dialect).serialize(dialect),
        predicate: query
            .where_clause
            .as_ref()
            .map(|w| w.to_sql(dialect))
            .unwrap_or_default(),
        group_by: query.group_by.iter().map(|e| e.to_sql(dialect)).collect(),
        order_by: query
            .order_by
            .iter()
            .map(|o| o.to_tokens(dialect).serialize(dialect))
            .collect(),
        limit,
        offset,
        columns: columns.into_iter().map(|c| c.output).collect(),
        query,
    })
}

// ============================================================================
// Validation and resolution
// ============================================================================

fn resolve<'r, 'q>(
    registry: &'r SchemaRegistry,
    request: &'q QueryRequest,
) -> CompileResult<Resolved<'r, 'q>> {
    // Unknown names win over every shape error.
    let measures = request
        .measures
        .iter()
        .map(|id| registry.lookup_measure(id))
        .collect::<SchemaResult<Vec<_>>>()?;
    let dimensions = request
        .dimensions
        .iter()
        .map(|id| registry.lookup_dimension(id))
        .collect::<SchemaResult<Vec<_>>>()?;
    let filters = request
        .filters
        .iter()
        .map(|f| -> SchemaResult<_> { Ok((f, registry.lookup_dimension(&f.dimension)?)) })
        .collect::<SchemaResult<Vec<_>>>()?;
    let time_dimension = request
        .time_dimension
        .as_ref()
        .map(|td| registry.lookup_dimension(&td.dimension))
        .transpose()?;
    for item in &request.order {
        if item.key != TIME_KEY
            && registry.lookup_measure(&item.key).is_err()
            && registry.lookup_dimension(&item.key).is_err()
        {
            return Err(CompileError::UnknownIdentifier(item.key.clone()));
        }
    }

    if measures.is_empty() && dimensions.is_empty() && time_dimension.is_none() {
        return Err(CompileError::EmptySelection);
    }
    check_unique(&request.measures)?;
    check_unique(&request.dimensions)?;

    let time = match (&request.time_dimension, time_dimension) {
        (Some(td), Some(dimension)) => {
            let bucket = bucket_expr(dimension, td.granularity)?;
            if let Some(range) = &td.date_range {
                validate_date_range(range)?;
            }
            Some(ResolvedTime { dimension, bucket })
        }
        _ => None,
    };

    Ok(Resolved {
        measures,
        dimensions,
        filters,
        time,
    })
}

fn check_unique(ids: &[String]) -> CompileResult<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(CompileError::DuplicateIdentifier(id.clone()));
        }
    }
    Ok(())
}

fn select_columns(
    resolved: &Resolved<'_, '_>,
    request: &QueryRequest,
) -> CompileResult<Vec<Column>> {
    let mut columns: Vec<Column> = Vec::new();
    let mut push = |expr: Expr,
                    alias: String,
                    member: &str,
                    role: ColumnRole|
     -> CompileResult<()> {
        if columns.iter().any(|c| c.output.alias == alias) {
            return Err(CompileError::DuplicateIdentifier(member.to_string()));
        }
        columns.push(Column {
            select: expr.alias(&alias),
            output: OutputColumn {
                alias,
                member: member.to_string(),
                role,
            },
        });
        Ok(())
    };

    for m in &resolved.measures {
        push(raw_sql(&m.sql), output_alias(&m.id), &m.id, ColumnRole::Measure)?;
    }
    for d in &resolved.dimensions {
        push(dimension_expr(d), output_alias(&d.id), &d.id, ColumnRole::Dimension)?;
    }
    if let (Some(td), Some(time)) = (&request.time_dimension, &resolved.time) {
        push(time.bucket.clone(), TIME_KEY.to_string(), &td.dimension, ColumnRole::Time)?;
    }

    Ok(columns)
}

fn order_by(
    request: &QueryRequest,
    columns: &[Column],
) -> CompileResult<Vec<OrderByExpr>> {
    if request.order.is_empty() {
        let has_time = columns.iter().any(|c| c.output.role == ColumnRole::Time);
        return Ok(if has_time {
            vec![OrderByExpr::asc(col(TIME_KEY))]
        } else {
            Vec::new()
        });
    }

    request
        .order
        .iter()
        .map(|item| -> CompileResult<OrderByExpr> {
            let column = if item.key == TIME_KEY {
                columns.iter().find(|c| c.output.role == ColumnRole::Time)
            } else {
                columns.iter().find(|c| c.output.member == item.key)
            };
            let column =
                column.ok_or_else(|| CompileError::OrderKeyNotSelected(item.key.clone()))?;

            let key = col(&column.output.alias);
            Ok(match item.direction {
                SortDirection::Asc => OrderByExpr::asc(key),
                SortDirection::Desc => OrderByExpr::desc(key),
            })
        })
        .collect()
}

fn pagination(
    request: &QueryRequest,
    options: &CompileOptions,
) -> CompileResult<(Option<u64>, Option<u64>)> {
    for (name, value) in [("limit", request.limit), ("offset", request.offset)] {
        if value.is_some_and(|v| v > i64::MAX as u64) {
            return Err(CompileError::InvalidRequest(format!(
                "{} must not exceed {}",
                name,
                i64::MAX
            )));
        }
    }

    // A zero limit means no limit.
    let limit = match (request.limit, options.max_limit) {
        (None | Some(0), _) => None,
        (Some(requested), Some(max)) if requested > max => {
            warn!(requested, max, "limit above configured maximum, clamping");
            Some(max)
        }
        (Some(requested), _) => Some(requested),
    };
    if request.offset.is_some() && limit.is_none() {
        return Err(CompileError::OffsetWithoutLimit);
    }
    Ok((limit, request.offset))
}

// ============================================================================
// Clause building
// ============================================================================

fn required_tables(resolved: &Resolved<'_, '_>) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    tables.extend(resolved.measures.iter().map(|m| m.table.clone()));
    tables.extend(resolved.dimensions.iter().map(|d| d.table.clone()));
    tables.extend(resolved.filters.iter().map(|(_, d)| d.table.clone()));
    if let Some(time) = &resolved.time {
        tables.insert(time.dimension.table.clone());
    }
    tables
}

/// Selected dimensions then the time bucket, each expression once.
fn group_by(resolved: &Resolved<'_, '_>) -> Vec<Expr> {
    let mut exprs: Vec<Expr> = Vec::new();
    let candidates = resolved
        .dimensions
        .iter()
        .map(|d| dimension_expr(d))
        .chain(resolved.time.iter().map(|t| t.bucket.clone()));
    for expr in candidates {
        if !exprs.contains(&expr) {
            exprs.push(expr);
        }
    }
    exprs
}
