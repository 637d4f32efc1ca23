// Filter operators, combinators and validation, run against the SQLite fixture

use serde_json::{Value, json};

mod common;
use common::{names_by_id, search_tags, setup_test_db};

async fn filtered(filters: Value) -> Vec<String> {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let rows = search_tags(&db, &json!({ "filters": filters }))
        .await
        .expect("query should succeed");
    names_by_id(&rows).into_iter().map(String::from).collect()
}

#[tokio::test]
async fn test_comparison_operators() {
    let cases = [
        ("<", vec!["testTag"]),
        ("<=", vec!["testTag", "anotherTag"]),
        (">", vec!["customTag"]),
        (">=", vec!["anotherTag", "customTag"]),
        ("=", vec!["anotherTag"]),
        ("!=", vec!["testTag", "customTag"]),
    ];

    for (operator, expected) in cases {
        let names = filtered(json!([{"field": "priority", "operator": operator, "value": 5}])).await;
        assert_eq!(names, expected, "priority {operator} 5");
    }
}

#[tokio::test]
async fn test_pattern_operators() {
    let cases = [
        ("like", "test%", vec!["testTag"]),
        ("not like", "%other%", vec!["testTag", "customTag"]),
        ("ilike", "TEST%", vec!["testTag"]),
        ("not ilike", "%TAG", vec![]),
        ("ilike", "%CUSTOM%", vec!["customTag"]),
    ];

    for (operator, pattern, expected) in cases {
        let names = filtered(json!([{"field": "name", "operator": operator, "value": pattern}])).await;
        assert_eq!(names, expected, "name {operator} {pattern}");
    }
}

#[tokio::test]
async fn test_membership_operators() {
    let names = filtered(json!([{"field": "priority", "operator": "in", "value": [1, 10]}])).await;
    assert_eq!(names, vec!["testTag", "customTag"]);

    let names = filtered(json!([{"field": "priority", "operator": "not in", "value": [1, 10]}])).await;
    assert_eq!(names, vec!["anotherTag"]);

    // A scalar behaves as a one-element list
    let names = filtered(json!([{"field": "priority", "operator": "in", "value": 5}])).await;
    assert_eq!(names, vec!["anotherTag"]);

    // An array without an operator defaults to `in`
    let names = filtered(json!([{"field": "name", "value": ["testTag", "customTag"]}])).await;
    assert_eq!(names, vec!["testTag", "customTag"]);
}

#[tokio::test]
async fn test_json_containment_operators() {
    let names = filtered(json!([{"field": "labels", "operator": "all in", "value": ["blue", "red"]}])).await;
    assert_eq!(names, vec!["testTag"]);

    let names = filtered(json!([{"field": "labels", "operator": "any in", "value": ["blue", "green"]}])).await;
    assert_eq!(names, vec!["testTag", "anotherTag", "customTag"]);

    let names = filtered(json!([{"field": "labels", "operator": "any in", "value": "red"}])).await;
    assert_eq!(names, vec!["testTag"]);
}

#[tokio::test]
async fn test_null_checks() {
    let names = filtered(json!([{"field": "description", "operator": "=", "value": null}])).await;
    assert_eq!(names, vec!["customTag"]);

    let names = filtered(json!([{"field": "description", "operator": "!=", "value": null}])).await;
    assert_eq!(names, vec!["testTag", "anotherTag"]);
}

#[tokio::test]
async fn test_date_fields_compare_date_part() {
    let names = filtered(json!([{"field": "published_at", "value": "2024-01-15"}])).await;
    assert_eq!(names, vec!["testTag"], "time of day is ignored");

    let names = filtered(json!([{"field": "published_at", "operator": ">", "value": "2024-01-31"}])).await;
    assert_eq!(names, vec!["anotherTag", "customTag"]);

    let names = filtered(json!([{"field": "published_at", "operator": "<=", "value": "2024-02-01"}])).await;
    assert_eq!(names, vec!["testTag", "anotherTag"]);
}

#[tokio::test]
async fn test_or_combination() {
    let names = filtered(json!([
        {"field": "name", "operator": "=", "value": "testTag"},
        {"type": "or", "field": "priority", "operator": "=", "value": 5}
    ]))
    .await;
    assert_eq!(names, vec!["testTag", "anotherTag"]);
}

#[tokio::test]
async fn test_membership_or_membership() {
    let names = filtered(json!([
        {"field": "name", "operator": "in", "value": ["testTagA", "testTagB"]},
        {"type": "or", "field": "priority", "operator": "in", "value": [5, 10]}
    ]))
    .await;
    assert_eq!(names, vec!["anotherTag", "customTag"]);
}

#[tokio::test]
async fn test_and_binds_tighter_than_or() {
    // (priority >= 5 AND name = customTag) OR name = testTag
    let names = filtered(json!([
        {"field": "priority", "operator": ">=", "value": 5},
        {"field": "name", "value": "customTag"},
        {"type": "or", "field": "name", "value": "testTag"}
    ]))
    .await;
    assert_eq!(names, vec!["testTag", "customTag"]);
}

#[tokio::test]
async fn test_nested_groups() {
    // name = anotherTag OR (priority > 1 AND labels any in [green])
    let names = filtered(json!([
        {"field": "name", "value": "anotherTag"},
        {"type": "or", "nested": [
            {"field": "priority", "operator": ">", "value": 1},
            {"field": "labels", "operator": "any in", "value": ["green"]}
        ]}
    ]))
    .await;
    assert_eq!(names, vec!["anotherTag", "customTag"]);
}

#[tokio::test]
async fn test_or_filters_cannot_escape_soft_deletes() {
    // trashedTag matches the first branch but stays hidden
    let names = filtered(json!([
        {"field": "name", "value": "trashedTag"},
        {"type": "or", "field": "priority", "value": 1}
    ]))
    .await;
    assert_eq!(names, vec!["testTag"]);
}

#[tokio::test]
async fn test_depth_guard_boundary() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let one_level = json!({"filters": [
        {"field": "priority", "operator": ">=", "value": 5},
        {"type": "or", "nested": [{"field": "name", "value": "testTag"}]}
    ]});
    let rows = search_tags(&db, &one_level).await.expect("one level passes");
    assert_eq!(names_by_id(&rows), vec!["testTag", "anotherTag", "customTag"]);

    let two_levels = json!({"filters": [
        {"nested": [{"nested": [{"field": "name", "value": "testTag"}]}]}
    ]});
    let err = search_tags(&db, &two_levels).await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.validation_errors()[0].field, "filters");
    assert_eq!(err.validation_errors()[0].message, "Max nested depth 1 is exceeded");
}

#[tokio::test]
async fn test_membership_lists_do_not_count_as_nesting() {
    let names = filtered(json!([
        {"nested": [{"field": "labels", "operator": "all in", "value": ["red", "blue"]}]}
    ]))
    .await;
    assert_eq!(names, vec!["testTag"]);
}

#[tokio::test]
async fn test_validation_reports_every_path() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let err = search_tags(
        &db,
        &json!({"filters": [
            {"field": "secret", "value": 1},
            {"field": "priority", "operator": "between", "value": 1},
            {"field": "name", "operator": "=", "value": [1, 2]},
            {"field": "bad field!", "value": 1}
        ]}),
    )
    .await
    .unwrap_err();

    let fields: Vec<&str> = err
        .validation_errors()
        .iter()
        .map(|e| e.field.as_str())
        .collect();
    assert!(fields.contains(&"filters.0.field"), "{fields:?}");
    assert!(fields.contains(&"filters.1.operator"), "{fields:?}");
    assert!(fields.contains(&"filters.2.value"), "{fields:?}");
    assert!(fields.contains(&"filters.3.field"), "{fields:?}");
}

#[tokio::test]
async fn test_unrepresentable_requests_are_unprocessable() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let err = search_tags(
        &db,
        &json!({
            "filters": [
                {"field": "labels->color", "value": "red"},
                {"field": "priority", "operator": ">", "value": 18_446_744_073_709_551_615_u64}
            ],
            "sort": [{"field": "labels->0"}]
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let errors: Vec<(&str, &str)> = err
        .validation_errors()
        .iter()
        .map(|e| (e.field.as_str(), e.message.as_str()))
        .collect();
    assert_eq!(
        errors,
        vec![
            ("filters.0.field", "JSON paths are not supported"),
            ("filters.1.value", "The value is out of range"),
            ("sort.0.field", "JSON paths are not supported"),
        ]
    );
}

#[tokio::test]
async fn test_non_object_body_is_bad_request() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let err = search_tags(&db, &json!(["filters"])).await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
}
