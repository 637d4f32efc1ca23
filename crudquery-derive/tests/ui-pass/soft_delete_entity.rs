//! Test soft-delete, date detection, column renames and the page size

use crudquery::{QueryModel, ResourceDefinition};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, QueryModel)]
#[sea_orm(table_name = "posts")]
#[query(limit = 25)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub slug: String,

    #[sea_orm(column_name = "headline")]
    #[query(filterable, searchable)]
    pub title: String,

    #[query(filterable, sortable)]
    pub published_at: Option<DateTimeUtc>,

    #[query(soft_delete)]
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}
impl ActiveModelBehavior for ActiveModel {}

fn main() {
    assert_eq!(<Model as QueryModel>::PRIMARY_KEY, "slug");
    assert_eq!(<Model as QueryModel>::SOFT_DELETE_COLUMN, Some("deleted_at"));
    assert_eq!(<Model as QueryModel>::PAGINATION_LIMIT, 25);
    assert_eq!(Model::filterable_fields(), vec!["headline", "published_at"]);
    assert_eq!(Model::date_fields(), vec!["published_at", "deleted_at"]);

    let posts = ResourceDefinition::for_model::<Model>();
    assert_eq!(posts.default_limit(), 25);
    assert!(posts.whitelist().can_filter("headline"));
    assert!(posts.model().is_date_field("deleted_at"));
}
