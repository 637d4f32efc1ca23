//! Test that a basic entity compiles and reports its metadata

use crudquery::QueryModel;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, QueryModel)]
#[sea_orm(table_name = "todos")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[query(filterable, sortable)]
    pub id: i32,

    #[query(filterable, sortable, searchable)]
    pub title: String,

    pub completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}
impl ActiveModelBehavior for ActiveModel {}

fn main() {
    assert_eq!(<Model as QueryModel>::TABLE_NAME, "todos");
    assert_eq!(<Model as QueryModel>::PRIMARY_KEY, "id");
    assert_eq!(<Model as QueryModel>::SOFT_DELETE_COLUMN, None);
    assert_eq!(Model::filterable_fields(), vec!["id", "title"]);
    assert_eq!(Model::searchable_fields(), vec!["title"]);
    assert!(Model::date_fields().is_empty());
}
