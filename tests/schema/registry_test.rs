// tests/schema/registry_test.rs
use classmetrics::schema::{
    AggregationKind, DimensionDefinition, DimensionKind, Granularity, JoinStep, MeasureDefinition,
    SchemaError, SchemaRegistry, PRIORITY,
};

fn minimal() -> classmetrics::schema::SchemaRegistryBuilder {
    SchemaRegistry::builder()
        .table("events", "e")
        .table("users", "u")
        .priority(["events", "users"])
}

#[test]
fn test_classroom_lookup_measure() {
    let registry = SchemaRegistry::classroom().unwrap();
    let measure = registry.lookup_measure("events.unique_users").unwrap();

    assert_eq!(measure.table, "events");
    assert_eq!(measure.aggregation, AggregationKind::Count);
    assert_eq!(measure.sql, "COUNT(DISTINCT e.user_id)");
}

#[test]
fn test_classroom_lookup_dimension() {
    let registry = SchemaRegistry::classroom().unwrap();
    let dim = registry.lookup_dimension("time.week").unwrap();

    assert_eq!(dim.kind, DimensionKind::Time);
    assert_eq!(dim.grain, Some(Granularity::Week));
    assert!(dim.is_time());
}

#[test]
fn test_lookup_is_case_sensitive() {
    let registry = SchemaRegistry::classroom().unwrap();
    assert_eq!(
        registry.lookup_measure("Events.Count"),
        Err(SchemaError::MeasureNotFound("Events.Count".into()))
    );
}

#[test]
fn test_measure_is_not_a_dimension() {
    let registry = SchemaRegistry::classroom().unwrap();
    assert_eq!(
        registry.lookup_dimension("events.count"),
        Err(SchemaError::DimensionNotFound("events.count".into()))
    );
}

#[test]
fn test_every_member_table_has_an_alias() {
    let registry = SchemaRegistry::classroom().unwrap();
    for measure in registry.measures() {
        assert!(registry.alias(&measure.table).is_some(), "{}", measure.id);
    }
    for dim in registry.dimensions() {
        assert!(registry.alias(&dim.table).is_some(), "{}", dim.id);
    }
}

#[test]
fn test_classroom_priority_order() {
    let registry = SchemaRegistry::classroom().unwrap();
    let priority: Vec<&str> = registry.priority().iter().map(String::as_str).collect();
    assert_eq!(priority, PRIORITY.to_vec());
}

#[test]
fn test_catalogue_lists_members_sorted() {
    let registry = SchemaRegistry::classroom().unwrap();
    let catalogue = registry.catalogue();

    assert_eq!(catalogue.measures.len(), 12);
    assert_eq!(catalogue.dimensions.len(), 16);

    let names: Vec<&str> = catalogue.measures.iter().map(|m| m.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);

    let role = catalogue
        .dimensions
        .iter()
        .find(|d| d.name == "users.role")
        .unwrap();
    assert_eq!(role.kind, "string");
    assert_eq!(role.table, "users");
}

#[test]
fn test_catalogue_serializes_type_field() {
    let registry = SchemaRegistry::classroom().unwrap();
    let json = serde_json::to_value(registry.catalogue()).unwrap();
    let first = &json["measures"][0];
    assert!(first.get("type").is_some());
    assert!(first.get("kind").is_none());
}

#[test]
fn test_rejects_uppercase_identifier() {
    let err = minimal()
        .measure(MeasureDefinition::new(
            "Events.count",
            "events",
            AggregationKind::Count,
            "COUNT(*)",
        ))
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::InvalidIdentifier("Events.count".into()));
}

#[test]
fn test_rejects_identifier_without_group() {
    let err = minimal()
        .measure(MeasureDefinition::new(
            "count",
            "events",
            AggregationKind::Count,
            "COUNT(*)",
        ))
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::InvalidIdentifier("count".into()));
}

#[test]
fn test_rejects_member_shared_by_measure_and_dimension() {
    let err = minimal()
        .measure(MeasureDefinition::new(
            "events.type",
            "events",
            AggregationKind::Count,
            "COUNT(*)",
        ))
        .dimension(DimensionDefinition::new(
            "events.type",
            "events",
            DimensionKind::String,
            "e.event_type",
        ))
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::DuplicateMember("events.type".into()));
}

#[test]
fn test_rejects_unknown_table() {
    let err = minimal()
        .measure(MeasureDefinition::new(
            "orders.count",
            "orders",
            AggregationKind::Count,
            "COUNT(*)",
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnknownTable { ref table, .. } if table == "orders"));
}

#[test]
fn test_rejects_duplicate_alias() {
    let err = SchemaRegistry::builder()
        .table("events", "e")
        .table("enrolments", "e")
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        SchemaError::DuplicateAlias {
            alias: "e".into(),
            first: "events".into(),
            second: "enrolments".into(),
        }
    );
}

#[test]
fn test_rejects_unparseable_expression() {
    let err = minimal()
        .measure(MeasureDefinition::new(
            "events.count",
            "events",
            AggregationKind::Count,
            "COUNT(*",
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidExpression { ref member, .. } if member == "events.count"));
}

#[test]
fn test_rejects_trailing_tokens_in_expression() {
    let err = minimal()
        .dimension(DimensionDefinition::new(
            "users.role",
            "users",
            DimensionKind::String,
            "u.role FROM users",
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidExpression { .. }));
}

#[test]
fn test_rejects_grain_on_string_dimension() {
    let err = minimal()
        .dimension(
            DimensionDefinition::new("users.role", "users", DimensionKind::String, "u.role")
                .with_grain(Granularity::Day),
        )
        .build()
        .unwrap_err();
    assert_eq!(err, SchemaError::GrainOnNonTimeDimension("users.role".into()));
}

#[test]
fn test_rejects_join_through_unknown_table() {
    let err = minimal()
        .join(
            "events",
            "users",
            vec![
                JoinStep::new("memberships", "events", "membership_id", "id"),
                JoinStep::new("users", "memberships", "user_id", "id"),
            ],
        )
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnknownTable { ref table, .. } if table == "memberships"));
}

#[test]
fn test_fallback_defaults_to_first_priority_table() {
    let registry = SchemaRegistry::builder()
        .table("users", "u")
        .table("events", "e")
        .priority(["events", "users"])
        .build()
        .unwrap();
    assert_eq!(registry.fallback_table(), "events");
}

#[test]
fn test_registry_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SchemaRegistry>();
}

#[test]
fn test_custom_registry_keeps_members_and_joins() {
    let registry = minimal()
        .measure(MeasureDefinition::new(
            "events.count",
            "events",
            AggregationKind::Count,
            "COUNT(*)",
        ))
        .dimension(DimensionDefinition::new(
            "users.role",
            "users",
            DimensionKind::String,
            "u.role",
        ))
        .join(
            "events",
            "users",
            vec![JoinStep::new("users", "events", "user_id", "id")],
        )
        .build()
        .unwrap();

    assert_eq!(registry.lookup_measure("events.count").unwrap().table, "events");
    assert_eq!(registry.lookup_dimension("users.role").unwrap().sql, "u.role");
    assert_eq!(registry.measures().count(), 1);
    assert_eq!(registry.dimensions().count(), 1);
    assert_eq!(registry.tables().len(), 2);
    assert_eq!(registry.fallback_table(), "events");
}
