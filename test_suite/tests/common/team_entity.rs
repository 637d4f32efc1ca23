use crudquery::QueryModel;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, QueryModel)]
#[sea_orm(table_name = "teams")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[query(filterable, sortable)]
    pub id: i32,

    #[query(filterable, sortable, searchable)]
    pub name: String,

    pub owner_id: i32,

    #[query(soft_delete)]
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tag_entity::Entity")]
    Tags,
    #[sea_orm(
        belongs_to = "super::user_entity::Entity",
        from = "Column::OwnerId",
        to = "super::user_entity::Column::Id"
    )]
    Owner,
}

impl Related<super::tag_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
