use crudquery::QueryModel;
use sea_orm::entity::prelude::*;

/// Notes attach to tags and posts alike through `notable_type`/`notable_id`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, QueryModel)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[query(filterable, searchable)]
    pub body: String,

    pub notable_type: String,

    pub notable_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
