use crudquery::QueryModel;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, QueryModel)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[query(filterable, sortable)]
    pub id: i32,

    #[query(filterable, sortable, searchable)]
    pub name: String,

    #[query(filterable, sortable)]
    pub priority: i32,

    #[query(filterable)]
    pub team_id: Option<i32>,

    /// JSON array of label strings
    #[query(filterable)]
    pub labels: String,

    #[query(filterable, searchable)]
    pub description: Option<String>,

    #[query(filterable, sortable, date)]
    pub published_at: String,

    #[query(soft_delete)]
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team_entity::Entity",
        from = "Column::TeamId",
        to = "super::team_entity::Column::Id"
    )]
    Team,
}

impl Related<super::team_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
