//! Built-in catalogue for the classroom telemetry store.

use super::definitions::{
    AggregationKind, DimensionDefinition, DimensionKind, Granularity, MeasureDefinition,
};
use super::error::SchemaResult;
use super::registry::SchemaRegistry;
use super::relationships::JoinStep;

/// Primary-table preference used when several tables are involved.
pub const PRIORITY: [&str; 8] = [
    "events",
    "sessions",
    "users",
    "quizzes",
    "quiz_sessions",
    "content",
    "schools",
    "classrooms",
];

impl SchemaRegistry {
    /// Registry over the classroom telemetry tables (events, sessions, users,
    /// quizzes, content and the school/classroom hierarchy).
    pub fn classroom() -> SchemaResult<SchemaRegistry> {
        let builder = SchemaRegistry::builder()
            .table("events", "e")
            .table("sessions", "s")
            .table("users", "u")
            .table("quizzes", "q")
            .table("quiz_sessions", "qs")
            .table("content", "c")
            .table("schools", "sch")
            .table("classrooms", "cl")
            .table("user_classrooms", "uc")
            .priority(PRIORITY)
            .fallback("events");

        let builder = measures()
            .into_iter()
            .fold(builder, |b, m| b.measure(m));
        let builder = dimensions()
            .into_iter()
            .fold(builder, |b, d| b.dimension(d));

        joins()
            .into_iter()
            .fold(builder, |b, (primary, target, steps)| {
                b.join(primary, target, steps)
            })
            .build()
    }
}

fn measures() -> Vec<MeasureDefinition> {
    use AggregationKind::*;

    vec![
        MeasureDefinition::new("events.count", "events", Count, "COUNT(*)")
            .with_description("Total number of events"),
        MeasureDefinition::new(
            "events.unique_users",
            "events",
            Count,
            "COUNT(DISTINCT e.user_id)",
        )
        .with_description("Number of unique users generating events"),
        MeasureDefinition::new("sessions.count", "sessions", Count, "COUNT(*)")
            .with_description("Total number of sessions"),
        MeasureDefinition::new(
            "sessions.avg_duration",
            "sessions",
            Avg,
            "AVG(s.duration_seconds / 60.0)",
        )
        .with_description("Average session duration in minutes"),
        MeasureDefinition::new(
            "sessions.total_duration",
            "sessions",
            Sum,
            "SUM(s.duration_seconds / 60.0)",
        )
        .with_description("Total session duration in minutes"),
        MeasureDefinition::new("users.count", "users", Count, "COUNT(*)")
            .with_description("Total number of users"),
        MeasureDefinition::new("users.active_count", "users", Count, "COUNT(u.last_active)")
            .with_description("Number of users with recorded activity"),
        MeasureDefinition::new("quizzes.count", "quizzes", Count, "COUNT(*)")
            .with_description("Total number of quizzes"),
        MeasureDefinition::new(
            "quiz_sessions.avg_score",
            "quiz_sessions",
            Avg,
            "AVG(qs.percentage_score)",
        )
        .with_description("Average quiz score percentage"),
        MeasureDefinition::new(
            "quiz_sessions.completion_rate",
            "quiz_sessions",
            Avg,
            "AVG(CASE WHEN qs.is_completed THEN 1.0 ELSE 0.0 END) * 100",
        )
        .with_description("Quiz completion rate percentage"),
        MeasureDefinition::new("content.count", "content", Count, "COUNT(*)")
            .with_description("Total number of content items"),
        MeasureDefinition::new(
            "content.avg_file_size",
            "content",
            Avg,
            "AVG(c.file_size_bytes / 1024.0 / 1024.0)",
        )
        .with_description("Average content file size in MB"),
    ]
}

fn dimensions() -> Vec<DimensionDefinition> {
    use DimensionKind::{Number, Time};
    let text = DimensionKind::String;

    vec![
        DimensionDefinition::time("time.date", "events", "e.created_at", Granularity::Day)
            .with_description("Date of the event"),
        DimensionDefinition::time("time.hour", "events", "e.created_at", Granularity::Hour)
            .with_description("Hour of the event"),
        DimensionDefinition::time("time.week", "events", "e.created_at", Granularity::Week)
            .with_description("Week of the event"),
        DimensionDefinition::time("time.month", "events", "e.created_at", Granularity::Month)
            .with_description("Month of the event"),
        DimensionDefinition::new("users.role", "users", text, "u.role")
            .with_description("User role (teacher, student, admin)"),
        DimensionDefinition::new("users.school_id", "users", text, "CAST(u.school_id AS TEXT)")
            .with_description("School identifier"),
        DimensionDefinition::new("events.type", "events", text, "e.event_type")
            .with_description("Type of event"),
        DimensionDefinition::new("events.application", "events", text, "e.application")
            .with_description("Application source (whiteboard, notebook)"),
        DimensionDefinition::new("sessions.application", "sessions", text, "s.application")
            .with_description("Session application type"),
        DimensionDefinition::new("sessions.start_time", "sessions", Time, "s.start_time")
            .with_description("Session start timestamp"),
        DimensionDefinition::new(
            "quiz_sessions.started_at",
            "quiz_sessions",
            Time,
            "qs.started_at",
        )
        .with_description("Quiz attempt start timestamp"),
        DimensionDefinition::new("content.type", "content", text, "c.content_type")
            .with_description("Type of content"),
        DimensionDefinition::new("schools.name", "schools", text, "sch.name")
            .with_description("School name"),
        DimensionDefinition::new("classrooms.name", "classrooms", text, "cl.name")
            .with_description("Classroom name"),
        DimensionDefinition::new("classrooms.grade_level", "classrooms", Number, "cl.grade_level")
            .with_description("Classroom grade level"),
        DimensionDefinition::new("classrooms.subject", "classrooms", text, "cl.subject")
            .with_description("Classroom subject"),
    ]
}

type JoinEdge = (&'static str, &'static str, Vec<JoinStep>);

fn step(table: &str, from_table: &str, from_column: &str, to_column: &str) -> JoinStep {
    JoinStep::new(table, from_table, from_column, to_column)
}

fn joins() -> Vec<JoinEdge> {
    vec![
        ("events", "users", vec![step("users", "events", "user_id", "id")]),
        ("events", "sessions", vec![step("sessions", "events", "session_id", "id")]),
        ("events", "classrooms", vec![step("classrooms", "events", "classroom_id", "id")]),
        ("events", "schools", vec![step("schools", "events", "school_id", "id")]),
        ("sessions", "users", vec![step("users", "sessions", "user_id", "id")]),
        ("sessions", "classrooms", vec![step("classrooms", "sessions", "classroom_id", "id")]),
        (
            "sessions",
            "schools",
            vec![
                step("classrooms", "sessions", "classroom_id", "id"),
                step("schools", "classrooms", "school_id", "id"),
            ],
        ),
        ("users", "schools", vec![step("schools", "users", "school_id", "id")]),
        (
            "users",
            "classrooms",
            vec![
                step("user_classrooms", "users", "id", "user_id"),
                step("classrooms", "user_classrooms", "classroom_id", "id"),
            ],
        ),
        ("users", "quiz_sessions", vec![step("quiz_sessions", "users", "id", "student_id")]),
        ("quizzes", "classrooms", vec![step("classrooms", "quizzes", "classroom_id", "id")]),
        (
            "quizzes",
            "schools",
            vec![
                step("classrooms", "quizzes", "classroom_id", "id"),
                step("schools", "classrooms", "school_id", "id"),
            ],
        ),
        ("quizzes", "users", vec![step("users", "quizzes", "creator_id", "id")]),
        ("quizzes", "quiz_sessions", vec![step("quiz_sessions", "quizzes", "id", "quiz_id")]),
        ("quiz_sessions", "quizzes", vec![step("quizzes", "quiz_sessions", "quiz_id", "id")]),
        (
            "quiz_sessions",
            "classrooms",
            vec![
                step("quizzes", "quiz_sessions", "quiz_id", "id"),
                step("classrooms", "quizzes", "classroom_id", "id"),
            ],
        ),
        ("content", "users", vec![step("users", "content", "creator_id", "id")]),
        ("content", "classrooms", vec![step("classrooms", "content", "classroom_id", "id")]),
        (
            "content",
            "schools",
            vec![
                step("classrooms", "content", "classroom_id", "id"),
                step("schools", "classrooms", "school_id", "id"),
            ],
        ),
        ("classrooms", "schools", vec![step("schools", "classrooms", "school_id", "id")]),
    ]
}
