// Root, relation and multi-hop sorting, compared against hand-written joins

use sea_orm::{DatabaseConnection, DbBackend, EntityTrait, Statement};
use serde_json::json;

mod common;
use common::{names, search_tags, setup_test_db, tag_entity};

async fn manual(db: &DatabaseConnection, sql: &str) -> Vec<tag_entity::Model> {
    tag_entity::Entity::find()
        .from_raw_sql(Statement::from_string(DbBackend::Sqlite, sql))
        .all(db)
        .await
        .expect("manual query should succeed")
}

#[tokio::test]
async fn test_root_sort() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let rows = search_tags(&db, &json!({"sort": [{"field": "priority", "direction": "desc"}]}))
        .await
        .unwrap();
    assert_eq!(names(&rows), vec!["customTag", "anotherTag", "testTag"]);

    // direction defaults to asc
    let rows = search_tags(&db, &json!({"sort": [{"field": "name"}]})).await.unwrap();
    assert_eq!(names(&rows), vec!["anotherTag", "customTag", "testTag"]);
}

#[tokio::test]
async fn test_relation_sort_matches_manual_join() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let rows = search_tags(&db, &json!({"sort": [{"field": "team.name", "direction": "asc"}]}))
        .await
        .unwrap();
    let expected = manual(
        &db,
        r#"SELECT "tags".* FROM "tags"
           LEFT JOIN "teams" ON "teams"."id" = "tags"."team_id" AND "teams"."deleted_at" IS NULL
           WHERE "tags"."deleted_at" IS NULL
           ORDER BY "teams"."name" ASC"#,
    )
    .await;

    assert_eq!(rows, expected);
    // the soft-deleted legacy team joins as NULL, which SQLite sorts first
    assert_eq!(names(&rows), vec!["customTag", "testTag", "anotherTag"]);
}

#[tokio::test]
async fn test_relation_sort_keeps_root_columns() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let rows = search_tags(&db, &json!({"sort": [{"field": "team.name", "direction": "desc"}]}))
        .await
        .unwrap();

    // ids and names are the tags' own, not the joined teams'
    let pairs: Vec<(i32, &str)> = rows.iter().map(|r| (r.id, r.name.as_str())).collect();
    assert_eq!(pairs, vec![(2, "anotherTag"), (1, "testTag"), (3, "customTag")]);
    assert!(rows.iter().all(|r| r.deleted_at.is_none()));
}

#[tokio::test]
async fn test_multi_hop_sort() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let rows = search_tags(
        &db,
        &json!({"sort": [{"field": "team.owner.name", "direction": "desc"}]}),
    )
    .await
    .unwrap();
    let expected = manual(
        &db,
        r#"SELECT "tags".* FROM "tags"
           LEFT JOIN "teams" ON "teams"."id" = "tags"."team_id" AND "teams"."deleted_at" IS NULL
           LEFT JOIN "users" ON "users"."id" = "teams"."owner_id"
           WHERE "tags"."deleted_at" IS NULL
           ORDER BY "users"."name" DESC"#,
    )
    .await;

    assert_eq!(rows, expected);
    assert_eq!(names(&rows), vec!["anotherTag", "testTag", "customTag"]);
}

#[tokio::test]
async fn test_sorts_apply_in_request_order() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let rows = search_tags(
        &db,
        &json!({
            "with_trashed": true,
            "sort": [
                {"field": "team.name", "direction": "asc"},
                {"field": "priority", "direction": "desc"}
            ]
        }),
    )
    .await
    .unwrap();
    // core holds trashedTag (7) and testTag (1)
    assert_eq!(names(&rows), vec!["customTag", "trashedTag", "testTag", "anotherTag"]);
}

#[tokio::test]
async fn test_relation_sort_with_relation_filter() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let rows = search_tags(
        &db,
        &json!({
            "filters": [{"field": "team.name", "operator": "in", "value": ["core", "web"]}],
            "sort": [{"field": "team.name", "direction": "desc"}]
        }),
    )
    .await
    .unwrap();
    assert_eq!(names(&rows), vec!["anotherTag", "testTag"]);
}

#[tokio::test]
async fn test_unsortable_field_is_rejected() {
    let db = setup_test_db().await.expect("Failed to setup test database");

    let err = search_tags(&db, &json!({"sort": [{"field": "labels"}]}))
        .await
        .unwrap_err();
    assert_eq!(err.validation_errors()[0].field, "sort.0.field");
    assert_eq!(err.validation_errors()[0].message, "The field 'labels' is not sortable");

    let err = search_tags(&db, &json!({"sort": [{"field": "name", "direction": "up"}]}))
        .await
        .unwrap_err();
    assert_eq!(err.validation_errors()[0].field, "sort.0.direction");
}
