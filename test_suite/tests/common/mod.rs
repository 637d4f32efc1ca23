#![allow(dead_code)]

use crudquery::{
    ApiError, ModelMeta, Operation, PivotTable, QueryBuilder, RelationKind, ResourceDefinition,
};
use sea_orm::{
    Condition, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, QueryTrait,
    RelationTrait, Select,
    sea_query::{Alias, Expr},
};
use sea_orm_migration::prelude::*;
use serde_json::Value;

pub mod note_entity;
pub mod post_entity;
pub mod tag_entity;
pub mod team_entity;
pub mod user_entity;

// Helper function to get database URL from environment or default to SQLite
fn get_test_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string())
}

/// Build logs for failing tests, e.g. `RUST_LOG=crudquery=debug`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory database with the fixture schema and rows.
///
/// Live tags (`deleted_at IS NULL`):
///
/// | id | name       | priority | team   | labels            | description  | `published_at`        |
/// |----|------------|----------|--------|-------------------|--------------|---------------------|
/// | 1  | testTag    | 1        | core   | `["red","blue"]`  | test value   | 2024-01-15 08:30:00 |
/// | 2  | anotherTag | 5        | web    | `["blue"]`        | TEST value   | 2024-02-01 12:00:00 |
/// | 3  | customTag  | 10       | legacy | `["green"]`       | NULL         | 2024-03-10 23:59:59 |
///
/// plus `trashedTag` (id 4, priority 7, core) which is soft-deleted. The
/// `legacy` team is soft-deleted too.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect(&get_test_database_url()).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateTables), Box::new(SeedFixtures)]
    }
}

pub struct CreateTables;

#[async_trait::async_trait]
impl MigrationName for CreateTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            )",
        )
        .await?;
        db.execute_unprepared(
            "CREATE TABLE teams (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id INTEGER NOT NULL REFERENCES users(id),
                deleted_at TEXT NULL
            )",
        )
        .await?;
        db.execute_unprepared(
            "CREATE TABLE tags (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                priority INTEGER NOT NULL,
                team_id INTEGER NULL REFERENCES teams(id),
                labels TEXT NOT NULL DEFAULT '[]',
                description TEXT NULL,
                published_at TEXT NOT NULL,
                deleted_at TEXT NULL
            )",
        )
        .await?;
        db.execute_unprepared(
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL
            )",
        )
        .await?;
        db.execute_unprepared(
            "CREATE TABLE post_tag (
                post_id INTEGER NOT NULL REFERENCES posts(id),
                tag_id INTEGER NOT NULL REFERENCES tags(id),
                weight INTEGER NOT NULL,
                attached_at TEXT NOT NULL,
                PRIMARY KEY (post_id, tag_id)
            )",
        )
        .await?;
        db.execute_unprepared(
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY,
                body TEXT NOT NULL,
                notable_type TEXT NOT NULL,
                notable_id INTEGER NOT NULL
            )",
        )
        .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for table in ["notes", "post_tag", "posts", "tags", "teams", "users"] {
            db.execute_unprepared(&format!("DROP TABLE IF EXISTS {table}"))
                .await?;
        }
        Ok(())
    }
}

pub struct SeedFixtures;

#[async_trait::async_trait]
impl MigrationName for SeedFixtures {
    fn name(&self) -> &'static str {
        "m20240101_000002_seed_fixtures"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for SeedFixtures {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("INSERT INTO users (id, name) VALUES (1, 'ada'), (2, 'linus')")
            .await?;
        db.execute_unprepared(
            "INSERT INTO teams (id, name, owner_id, deleted_at) VALUES
                (1, 'core', 1, NULL),
                (2, 'web', 2, NULL),
                (3, 'legacy', 1, '2024-01-01 00:00:00')",
        )
        .await?;
        db.execute_unprepared(
            r#"INSERT INTO tags (id, name, priority, team_id, labels, description, published_at, deleted_at) VALUES
                (1, 'testTag', 1, 1, '["red","blue"]', 'test value', '2024-01-15 08:30:00', NULL),
                (2, 'anotherTag', 5, 2, '["blue"]', 'TEST value', '2024-02-01 12:00:00', NULL),
                (3, 'customTag', 10, 3, '["green"]', NULL, '2024-03-10 23:59:59', NULL),
                (4, 'trashedTag', 7, 1, '[]', 'test trashed', '2024-01-15 00:00:00', '2024-04-01 00:00:00')"#,
        )
        .await?;
        db.execute_unprepared("INSERT INTO posts (id, title) VALUES (1, 'Rust tips'), (2, 'Web news')")
            .await?;
        db.execute_unprepared(
            "INSERT INTO post_tag (post_id, tag_id, weight, attached_at) VALUES
                (1, 1, 3, '2024-05-01 10:00:00'),
                (1, 2, 2, '2024-06-01 09:00:00'),
                (2, 1, 1, '2024-05-02 18:00:00')",
        )
        .await?;
        db.execute_unprepared(
            "INSERT INTO notes (id, body, notable_type, notable_id) VALUES
                (1, 'needs review', 'tags', 2),
                (2, 'needs review', 'posts', 1),
                (3, 'approved', 'tags', 1)",
        )
        .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        for table in ["notes", "post_tag", "posts", "tags", "teams", "users"] {
            db.execute_unprepared(&format!("DELETE FROM {table}")).await?;
        }
        Ok(())
    }
}

/// The tag resource used by most tests.
pub fn tags_resource() -> ResourceDefinition {
    let team = RelationKind::from_relation_def(&tag_entity::Relation::Team.def())
        .expect("belongs-to relation converts");

    ResourceDefinition::for_model::<tag_entity::Model>()
        .relation("team", team)
        .relation(
            "posts",
            RelationKind::belongs_to_many("posts", "post_tag", "tag_id", "post_id"),
        )
        .relation("notes", RelationKind::morph_many("notes", "notable", "tags"))
        .related_model(
            ModelMeta::of::<team_entity::Model>()
                .with_relation("owner", RelationKind::belongs_to("users", "owner_id", "id")),
        )
        .related::<user_entity::Model>()
        .related::<post_entity::Model>()
        .related::<note_entity::Model>()
        .filterable_by(["team.*", "team.owner.name", "posts.title", "notes.body"])
        .filterable_by(["pivot.weight", "pivot.attached_at"])
        .sortable_by(["team.name", "team.owner.name", "pivot.weight"])
        .searchable_by(["team.name"])
        .exposed_scopes(["popular", "named", "unregistered"])
        .scope("popular", |args| {
            let minimum = args.int(0)?;
            Ok(Condition::all().add(
                Expr::col((tag_entity::Entity, tag_entity::Column::Priority)).gte(minimum),
            ))
        })
        .scope("named", |args| {
            let name = args.string(0)?;
            Ok(Condition::all()
                .add(Expr::col((tag_entity::Entity, tag_entity::Column::Name)).eq(name)))
        })
}

/// The team resource, for has-many filters.
pub fn teams_resource() -> ResourceDefinition {
    let tags = RelationKind::from_relation_def(&team_entity::Relation::Tags.def())
        .expect("has-many relation converts");

    ResourceDefinition::for_model::<team_entity::Model>()
        .relation("tags", tags)
        .related::<tag_entity::Model>()
        .filterable_by(["tags.priority", "tags.name"])
}

/// Tags attached to `post_id`, listed through the `post_tag` pivot.
pub fn tags_of_post(post_id: i32) -> Select<tag_entity::Entity> {
    let mut query = tag_entity::Entity::find();
    QueryTrait::query(&mut query)
        .inner_join(
            Alias::new("post_tag"),
            Expr::col((Alias::new("post_tag"), Alias::new("tag_id")))
                .equals((Alias::new("tags"), Alias::new("id"))),
        )
        .and_where(Expr::col((Alias::new("post_tag"), Alias::new("post_id"))).eq(post_id));
    query
}

pub fn post_tag_pivot() -> PivotTable {
    PivotTable::new("post_tag").with_date_fields(["attached_at"])
}

/// Parse, build and run a tag query.
pub async fn run_tags(
    db: &DatabaseConnection,
    builder: &QueryBuilder<'_>,
    query: Select<tag_entity::Entity>,
    body: &Value,
    operation: Operation,
) -> Result<Vec<tag_entity::Model>, ApiError> {
    let descriptor = builder.parse(body)?;
    let query = builder.build_query(query, &descriptor, operation)?;
    query
        .all(db)
        .await
        .map_err(|e| ApiError::internal("Query failed", Some(e.to_string())))
}

/// Search the tag resource with `body`.
pub async fn search_tags(
    db: &DatabaseConnection,
    body: &Value,
) -> Result<Vec<tag_entity::Model>, ApiError> {
    let definition = tags_resource();
    let builder = QueryBuilder::new(&definition, db.get_database_backend());
    run_tags(db, &builder, tag_entity::Entity::find(), body, Operation::Search).await
}

/// Tag names in result order.
pub fn names(rows: &[tag_entity::Model]) -> Vec<&str> {
    rows.iter().map(|row| row.name.as_str()).collect()
}

/// Tag names ordered by id, for assertions that ignore result order.
pub fn names_by_id(rows: &[tag_entity::Model]) -> Vec<&str> {
    let mut rows: Vec<&tag_entity::Model> = rows.iter().collect();
    rows.sort_by_key(|row| row.id);
    rows.into_iter().map(|row| row.name.as_str()).collect()
}
