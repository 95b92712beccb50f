// tests/connector/sqlite_test.rs
use classmetrics::compiler::{CompiledQuery, Compiler};
use classmetrics::connector::{ConnectorError, SqliteConnector, StorageConnector};
use classmetrics::request::{FilterClause, FilterOperator, QueryRequest, TimeDimensionClause};
use classmetrics::schema::{Granularity, SchemaRegistry};
use classmetrics::sql::Dialect;
use serde_json::json;

const FIXTURE: &str = r#"
CREATE TABLE users (id INTEGER PRIMARY KEY, role TEXT, school_id INTEGER, last_active TEXT);
CREATE TABLE sessions (
    id INTEGER PRIMARY KEY, user_id INTEGER, classroom_id INTEGER,
    application TEXT, start_time TEXT, duration_seconds INTEGER
);
CREATE TABLE events (
    id INTEGER PRIMARY KEY, user_id INTEGER, session_id INTEGER, classroom_id INTEGER,
    school_id INTEGER, event_type TEXT, application TEXT, created_at TEXT
);

INSERT INTO users VALUES
    (1, 'student', 10, '2024-01-02'),
    (2, 'student', 10, NULL),
    (3, 'teacher', 10, '2024-01-03');

INSERT INTO sessions VALUES
    (1, 1, 100, 'whiteboard', '2024-01-01 09:00:00', 600),
    (2, 2, 100, 'notebook',   '2024-01-01 10:00:00', 300),
    (3, 3, 100, 'whiteboard', '2024-01-02 11:00:00', 1200);

INSERT INTO events VALUES
    (1, 1, 1, 100, 10, 'login', 'whiteboard', '2024-01-01 09:00:00'),
    (2, 1, 1, 100, 10, 'draw',  'whiteboard', '2024-01-01 17:30:00'),
    (3, 3, 3, 100, 10, 'login', 'whiteboard', '2024-01-02 08:00:00'),
    (4, 2, 2, 100, 10, 'login', 'notebook',   '2024-02-15 12:00:00');
"#;

fn connector() -> SqliteConnector {
    let connector = SqliteConnector::open_in_memory().unwrap();
    connector.execute_batch(FIXTURE).unwrap();
    connector
}

fn compile(request: &QueryRequest) -> CompiledQuery {
    let registry = SchemaRegistry::classroom().unwrap();
    Compiler::new(&registry)
        .with_dialect(Dialect::Sqlite)
        .compile(request)
        .unwrap()
}

#[tokio::test]
async fn test_sessions_by_role_for_students() {
    let compiled = compile(
        &QueryRequest::new()
            .measure("sessions.count")
            .dimension("users.role")
            .filter(FilterClause::new(
                "users.role",
                FilterOperator::Eq,
                vec!["student".into()],
            )),
    );

    let result = connector().execute(&compiled).await.unwrap();
    assert_eq!(result.columns, vec!["sessions_count", "users_role"]);
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["sessions_count"], json!(2));
    assert_eq!(result.rows[0]["users_role"], json!("student"));
}

#[tokio::test]
async fn test_day_buckets_group_by_calendar_day() {
    let compiled = compile(
        &QueryRequest::new().measure("events.count").time_dimension(
            TimeDimensionClause::new("time.date", Granularity::Day)
                .with_date_range("2024-01-01", "2024-01-31"),
        ),
    );

    let result = connector().execute(&compiled).await.unwrap();
    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0]["time"], json!("2024-01-01"));
    assert_eq!(result.rows[0]["events_count"], json!(2));
    assert_eq!(result.rows[1]["time"], json!("2024-01-02"));
    assert_eq!(result.rows[1]["events_count"], json!(1));
}

#[tokio::test]
async fn test_date_range_includes_both_boundary_days() {
    let connector = connector();
    connector
        .execute_batch(
            "INSERT INTO events VALUES
                (5, 1, 1, 100, 10, 'login', 'whiteboard', '2023-12-31 23:59:59'),
                (6, 1, 1, 100, 10, 'draw',  'whiteboard', '2024-01-31 10:00:00'),
                (7, 3, 3, 100, 10, 'draw',  'whiteboard', '2024-01-31 23:30:00'),
                (8, 3, 3, 100, 10, 'login', 'whiteboard', '2024-02-01 00:00:00');",
        )
        .unwrap();
    let compiled = compile(
        &QueryRequest::new().measure("events.count").time_dimension(
            TimeDimensionClause::new("time.date", Granularity::Day)
                .with_date_range("2024-01-01", "2024-01-31"),
        ),
    );

    let result = connector.execute(&compiled).await.unwrap();
    let rows: Vec<_> = result
        .rows
        .iter()
        .map(|r| (r["time"].clone(), r["events_count"].clone()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (json!("2024-01-01"), json!(2)),
            (json!("2024-01-02"), json!(1)),
            (json!("2024-01-31"), json!(2)),
        ]
    );
}

#[tokio::test]
async fn test_single_day_range_counts_late_events() {
    let compiled = compile(
        &QueryRequest::new().measure("events.count").time_dimension(
            TimeDimensionClause::new("time.date", Granularity::Day)
                .with_date_range("2024-01-01", "2024-01-01"),
        ),
    );

    let result = connector().execute(&compiled).await.unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["time"], json!("2024-01-01"));
    assert_eq!(result.rows[0]["events_count"], json!(2));
}

#[tokio::test]
async fn test_month_buckets() {
    let compiled = compile(
        &QueryRequest::new()
            .measure("events.count")
            .time_dimension(TimeDimensionClause::new("time.date", Granularity::Month)),
    );

    let result = connector().execute(&compiled).await.unwrap();
    let buckets: Vec<_> = result.rows.iter().map(|r| r["time"].clone()).collect();
    assert_eq!(buckets, vec![json!("2024-01-01"), json!("2024-02-01")]);
}

#[tokio::test]
async fn test_contains_is_case_insensitive() {
    let compiled = compile(
        &QueryRequest::new()
            .measure("users.count")
            .filter(FilterClause::new(
                "users.role",
                FilterOperator::Contains,
                vec!["STUD".into()],
            )),
    );

    let result = connector().execute(&compiled).await.unwrap();
    assert_eq!(result.rows[0]["users_count"], json!(2));
}

#[tokio::test]
async fn test_join_across_tables() {
    let compiled = compile(
        &QueryRequest::new()
            .measure("events.count")
            .measure("events.unique_users")
            .dimension("users.role")
            .order_by("users.role", classmetrics::request::SortDirection::Asc),
    );

    let result = connector().execute(&compiled).await.unwrap();
    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0]["users_role"], json!("student"));
    assert_eq!(result.rows[0]["events_count"], json!(3));
    assert_eq!(result.rows[0]["events_unique_users"], json!(2));
    assert_eq!(result.rows[1]["users_role"], json!("teacher"));
}

#[tokio::test]
async fn test_rejects_query_for_other_dialect() {
    let registry = SchemaRegistry::classroom().unwrap();
    let compiled = Compiler::new(&registry)
        .compile(&QueryRequest::new().measure("users.count"))
        .unwrap();

    let err = connector().execute(&compiled).await.unwrap_err();
    assert!(matches!(
        err,
        ConnectorError::DialectMismatch {
            expected: Dialect::Sqlite,
            actual: Dialect::Postgres,
        }
    ));
}

#[tokio::test]
async fn test_missing_table_is_sqlite_error() {
    let compiled = compile(&QueryRequest::new().measure("quizzes.count"));
    let err = connector().execute(&compiled).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Sqlite(_)));
}
