// tests/compiler/granularity_test.rs
use classmetrics::compiler::{bucket_expr, dimension_expr, CompileError, Compiler};
use classmetrics::request::{QueryRequest, TimeDimensionClause};
use classmetrics::schema::{Granularity, SchemaRegistry};
use classmetrics::sql::Dialect;

fn bucket_sql(granularity: Granularity, dialect: Dialect) -> String {
    let registry = SchemaRegistry::classroom().unwrap();
    let dim = registry.lookup_dimension("sessions.start_time").unwrap();
    bucket_expr(dim, granularity).unwrap().to_sql(dialect)
}

#[test]
fn test_date_trunc_dialects() {
    for dialect in [Dialect::Postgres, Dialect::DuckDb] {
        for granularity in Granularity::ALL {
            assert_eq!(
                bucket_sql(granularity, dialect),
                format!("DATE_TRUNC('{}', s.start_time)", granularity)
            );
        }
    }
}

#[test]
fn test_sqlite_buckets() {
    let cases = [
        (Granularity::Hour, "STRFTIME('%Y-%m-%d %H:00:00', s.start_time)"),
        (Granularity::Day, "DATE(s.start_time)"),
        (Granularity::Week, "DATE(s.start_time, 'weekday 0', '-6 days')"),
        (Granularity::Month, "STRFTIME('%Y-%m-01', s.start_time)"),
        (Granularity::Year, "STRFTIME('%Y-01-01', s.start_time)"),
    ];
    for (granularity, expected) in cases {
        assert_eq!(bucket_sql(granularity, Dialect::Sqlite), expected);
    }
    assert!(bucket_sql(Granularity::Quarter, Dialect::Sqlite).starts_with("PRINTF('%s-%02d-01'"));
}

#[test]
fn test_intrinsic_grain_applies_when_selected_as_dimension() {
    let registry = SchemaRegistry::classroom().unwrap();
    let hour = registry.lookup_dimension("time.hour").unwrap();
    assert_eq!(
        dimension_expr(hour).to_sql(Dialect::Postgres),
        "DATE_TRUNC('hour', e.created_at)"
    );

    let start = registry.lookup_dimension("sessions.start_time").unwrap();
    assert_eq!(dimension_expr(start).to_sql(Dialect::Postgres), "s.start_time");
}

#[test]
fn test_time_column_uses_requested_granularity() {
    let registry = SchemaRegistry::classroom().unwrap();
    let request = QueryRequest::new()
        .measure("events.count")
        .time_dimension(TimeDimensionClause::new("time.hour", Granularity::Month));
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    let time = compiled.select.iter().find(|s| s.alias == "time").unwrap();
    assert_eq!(time.expr, "DATE_TRUNC('month', e.created_at)");
    assert_eq!(compiled.group_by, vec!["DATE_TRUNC('month', e.created_at)"]);
    assert_eq!(compiled.order_by, vec!["\"time\" ASC"]);
}

#[test]
fn test_time_only_request() {
    let registry = SchemaRegistry::classroom().unwrap();
    let request = QueryRequest::new()
        .time_dimension(TimeDimensionClause::new("sessions.start_time", Granularity::Day));
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    assert_eq!(compiled.from, "\"sessions\" AS \"s\"");
    assert_eq!(compiled.columns.len(), 1);
}

#[test]
fn test_same_bucket_selected_twice_grouped_once() {
    let registry = SchemaRegistry::classroom().unwrap();
    let request = QueryRequest::new()
        .measure("events.count")
        .dimension("time.date")
        .time_dimension(TimeDimensionClause::new("time.date", Granularity::Day));
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    assert_eq!(compiled.group_by, vec!["DATE_TRUNC('day', e.created_at)"]);
    assert_eq!(compiled.select.len(), 3);
}

#[test]
fn test_non_time_dimension_rejected() {
    let registry = SchemaRegistry::classroom().unwrap();
    let request = QueryRequest::new()
        .measure("events.count")
        .time_dimension(TimeDimensionClause::new("events.type", Granularity::Day));
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::NotATimeDimension("events.type".into())
    );
}

#[test]
fn test_unknown_time_dimension() {
    let registry = SchemaRegistry::classroom().unwrap();
    let request = QueryRequest::new()
        .measure("events.count")
        .time_dimension(TimeDimensionClause::new("time.decade", Granularity::Year));
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnknownIdentifier("time.decade".into())
    );
}
