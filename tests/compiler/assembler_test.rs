// tests/compiler/assembler_test.rs
use classmetrics::compiler::{
    ColumnRole, CompileError, CompileOptions, Compiler,
};
use classmetrics::request::{
    FilterClause, FilterOperator, QueryRequest, SortDirection, TimeDimensionClause,
};
use classmetrics::schema::{Granularity, SchemaRegistry};
use classmetrics::sql::Dialect;

fn registry() -> SchemaRegistry {
    SchemaRegistry::classroom().unwrap()
}

fn sessions_by_role() -> QueryRequest {
    QueryRequest::new()
        .measure("sessions.count")
        .dimension("users.role")
        .filter(FilterClause::new(
            "users.role",
            FilterOperator::Eq,
            vec!["student".into()],
        ))
}

// ============================================================================
// Output shape
// ============================================================================

#[test]
fn test_select_order_measures_dimensions_time() {
    let registry = registry();
    let request = QueryRequest::new()
        .dimension("events.type")
        .measure("events.count")
        .time_dimension(TimeDimensionClause::new("time.date", Granularity::Day));
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    let aliases: Vec<&str> = compiled.columns.iter().map(|c| c.alias.as_str()).collect();
    assert_eq!(aliases, vec!["events_count", "events_type", "time"]);
    let roles: Vec<ColumnRole> = compiled.columns.iter().map(|c| c.role).collect();
    assert_eq!(
        roles,
        vec![ColumnRole::Measure, ColumnRole::Dimension, ColumnRole::Time]
    );
    assert_eq!(compiled.columns[2].member, "time.date");
}

#[test]
fn test_measure_only_has_no_group_by() {
    let registry = registry();
    let request = QueryRequest::new().measure("users.count");
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    assert_eq!(compiled.sql, "SELECT\n  COUNT(*) AS \"users_count\"\nFROM \"users\" AS \"u\"");
    assert!(compiled.group_by.is_empty());
    assert!(compiled.order_by.is_empty());
}

#[test]
fn test_dimension_only_groups() {
    let registry = registry();
    let request = QueryRequest::new().dimension("content.type");
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    assert_eq!(compiled.group_by, vec!["c.content_type"]);
    assert_eq!(compiled.from, "\"content\" AS \"c\"");
}

#[test]
fn test_measures_from_two_tables_join() {
    let registry = registry();
    let request = QueryRequest::new()
        .measure("events.count")
        .measure("users.active_count")
        .dimension("users.role");
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    assert!(compiled.from.starts_with("\"events\" AS \"e\"\nLEFT JOIN \"users\" AS \"u\""));
}

#[test]
fn test_clauses_appear_in_full_sql() {
    let registry = registry();
    let compiled = Compiler::new(&registry)
        .compile(&sessions_by_role().limit(10))
        .unwrap();

    assert!(compiled.sql.contains(&compiled.from));
    assert!(compiled.sql.contains(&format!("WHERE {}", compiled.predicate)));
    assert!(compiled.sql.contains(&format!("GROUP BY {}", compiled.group_by.join(", "))));
    assert!(compiled.sql.ends_with("LIMIT 10"));
}

// ============================================================================
// Ordering and pagination
// ============================================================================

#[test]
fn test_explicit_order() {
    let registry = registry();
    let request = sessions_by_role()
        .order_by("sessions.count", SortDirection::Desc)
        .order_by("users.role", SortDirection::Asc);
    let compiled = Compiler::new(&registry).compile(&request).unwrap();

    assert_eq!(
        compiled.order_by,
        vec!["\"sessions_count\" DESC", "\"users_role\" ASC"]
    );
}

#[test]
fn test_order_by_time_key() {
    let registry = registry();
    let request = QueryRequest::new()
        .measure("sessions.count")
        .time_dimension(TimeDimensionClause::new("sessions.start_time", Granularity::Week))
        .order_by("time", SortDirection::Desc);
    let compiled = Compiler::new(&registry).compile(&request).unwrap();
    assert_eq!(compiled.order_by, vec!["\"time\" DESC"]);
}

#[test]
fn test_order_key_not_selected() {
    let registry = registry();
    let request = sessions_by_role().order_by("sessions.avg_duration", SortDirection::Asc);
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::OrderKeyNotSelected("sessions.avg_duration".into())
    );
}

#[test]
fn test_order_by_time_without_time_dimension() {
    let registry = registry();
    let request = sessions_by_role().order_by("time", SortDirection::Asc);
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::OrderKeyNotSelected("time".into())
    );
}

#[test]
fn test_order_key_unknown() {
    let registry = registry();
    let request = sessions_by_role().order_by("sessions.colour", SortDirection::Asc);
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnknownIdentifier("sessions.colour".into())
    );
}

#[test]
fn test_limit_and_offset_per_dialect() {
    let registry = registry();
    let request = sessions_by_role().limit(25).offset(50);
    for dialect in Dialect::all() {
        let compiled = Compiler::new(&registry)
            .with_dialect(dialect)
            .compile(&request)
            .unwrap();
        assert!(compiled.sql.ends_with("LIMIT 25 OFFSET 50"), "{}", compiled.sql);
        assert_eq!((compiled.limit, compiled.offset), (Some(25), Some(50)));
    }
}

#[test]
fn test_offset_without_limit() {
    let registry = registry();
    let request = sessions_by_role().offset(10);
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::OffsetWithoutLimit
    );
}

#[test]
fn test_max_limit_clamps() {
    let registry = registry();
    let options = CompileOptions::default().with_max_limit(500);
    let compiled = Compiler::new(&registry)
        .with_options(options)
        .compile(&sessions_by_role().limit(100_000))
        .unwrap();
    assert_eq!(compiled.limit, Some(500));
    assert!(compiled.sql.ends_with("LIMIT 500"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_selection() {
    let registry = registry();
    assert_eq!(
        Compiler::new(&registry).compile(&QueryRequest::new()).unwrap_err(),
        CompileError::EmptySelection
    );
}

#[test]
fn test_filter_only_request_is_empty_selection() {
    let registry = registry();
    let request = QueryRequest::new().filter(FilterClause::new(
        "users.role",
        FilterOperator::Eq,
        vec!["student".into()],
    ));
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::EmptySelection
    );
}

#[test]
fn test_unknown_filter_reported_before_empty_selection() {
    let registry = registry();
    let err = Compiler::new(&registry)
        .compile_json(
            r#"{"filters": [{"dimension": "bogus.dim", "operator": "equals", "values": ["x"]}]}"#,
        )
        .unwrap_err();
    assert_eq!(err, CompileError::UnknownIdentifier("bogus.dim".into()));
}

#[test]
fn test_unknown_duplicate_reported_as_unknown() {
    let registry = registry();
    let request = QueryRequest::new().measure("bogus.m").measure("bogus.m");
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnknownIdentifier("bogus.m".into())
    );
}

#[test]
fn test_unknown_order_key_reported_before_shape_errors() {
    let registry = registry();
    let request = QueryRequest::new()
        .measure("events.count")
        .measure("events.count")
        .order_by("events.colour", SortDirection::Asc);
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnknownIdentifier("events.colour".into())
    );
}

#[test]
fn test_unknown_measure() {
    let registry = registry();
    let request = QueryRequest::new().measure("events.total");
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnknownIdentifier("events.total".into())
    );
}

#[test]
fn test_dimension_named_as_measure() {
    let registry = registry();
    let request = QueryRequest::new().measure("users.role");
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnknownIdentifier("users.role".into())
    );
}

#[test]
fn test_duplicate_measure() {
    let registry = registry();
    let request = QueryRequest::new()
        .measure("events.count")
        .measure("events.count");
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::DuplicateIdentifier("events.count".into())
    );
}

#[test]
fn test_unreachable_join_from_request() {
    let registry = registry();
    let request = QueryRequest::new()
        .measure("sessions.count")
        .dimension("content.type");
    assert_eq!(
        Compiler::new(&registry).compile(&request).unwrap_err(),
        CompileError::UnreachableJoin {
            primary: "sessions".into(),
            table: "content".into(),
        }
    );
}

#[test]
fn test_every_error_is_a_client_error() {
    let registry = registry();
    let err = Compiler::new(&registry).compile(&QueryRequest::new()).unwrap_err();
    assert!(err.is_client_error());
}

// ============================================================================
// Determinism, fingerprints and concurrency
// ============================================================================

#[test]
fn test_compilation_is_deterministic() {
    let registry = registry();
    let compiler = Compiler::new(&registry).with_dialect(Dialect::DuckDb);
    let first = compiler.compile(&sessions_by_role()).unwrap();
    let second = compiler.compile(&sessions_by_role()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
}

#[test]
fn test_fingerprint_depends_on_params_and_dialect() {
    let registry = registry();
    let compiler = Compiler::new(&registry);
    let students = compiler.compile(&sessions_by_role()).unwrap();
    let teachers = compiler
        .compile(
            &QueryRequest::new()
                .measure("sessions.count")
                .dimension("users.role")
                .filter(FilterClause::new(
                    "users.role",
                    FilterOperator::Eq,
                    vec!["teacher".into()],
                )),
        )
        .unwrap();
    assert_eq!(students.sql, teachers.sql);
    assert_ne!(students.fingerprint().unwrap(), teachers.fingerprint().unwrap());

    let sqlite = compiler
        .with_dialect(Dialect::Sqlite)
        .compile(&sessions_by_role())
        .unwrap();
    assert_ne!(students.fingerprint().unwrap(), sqlite.fingerprint().unwrap());
    assert_eq!(sqlite.fingerprint().unwrap().len(), 64);
}

#[test]
fn test_concurrent_compilation_shares_registry() {
    let registry = registry();
    let expected = Compiler::new(&registry).compile(&sessions_by_role()).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| Compiler::new(&registry).compile(&sessions_by_role())))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), expected);
        }
    });
}

// ============================================================================
// JSON entry point
// ============================================================================

#[test]
fn test_compile_json() {
    let registry = registry();
    let compiled = Compiler::new(&registry)
        .with_dialect(Dialect::Sqlite)
        .compile_json(
            r#"{
                "measures": ["quiz_sessions.avg_score"],
                "dimensions": ["classrooms.subject"],
                "filters": [{"dimension": "classrooms.grade_level", "operator": "gte", "values": [6]}],
                "order": [["quiz_sessions.avg_score", "desc"]],
                "limit": 10
            }"#,
        )
        .unwrap();

    assert_eq!(compiled.dialect, Dialect::Sqlite);
    assert_eq!(compiled.predicate, "cl.grade_level >= ?1");
    assert_eq!(compiled.order_by, vec!["\"quiz_sessions_avg_score\" DESC"]);
}

#[test]
fn test_compiled_query_serializes() {
    let registry = registry();
    let compiled = Compiler::new(&registry).compile(&sessions_by_role()).unwrap();
    let json = serde_json::to_value(&compiled).unwrap();

    assert_eq!(json["dialect"], "postgres");
    assert_eq!(json["params"], serde_json::json!(["student"]));
    assert_eq!(json["columns"][1]["role"], "dimension");
    assert!(json.get("query").is_none());
}
