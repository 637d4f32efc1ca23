//! # crudquery
//!
//! Validated filter, search, sort and scope queries for Axum and Sea-ORM REST
//! resources.
//!
//! A client describes what it wants as JSON:
//!
//! ```json
//! {
//!   "scopes":  [{"name": "popular", "parameters": [5]}],
//!   "filters": [{"field": "team.name", "operator": "=", "value": "core"}],
//!   "search":  {"value": "rust"},
//!   "sort":    [{"field": "priority", "direction": "desc"}]
//! }
//! ```
//!
//! and the resource owner decides which fields, relations and scopes may be
//! used. Every request is checked against those whitelists before any SQL is
//! produced, values are always bound as parameters and relation paths are
//! resolved from declared metadata only.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crudquery::{Operation, QueryBuilder, QueryModel, ResourceDefinition};
//!
//! #[derive(Clone, Debug, PartialEq, DeriveEntityModel, QueryModel)]
//! #[sea_orm(table_name = "tags")]
//! pub struct Model {
//!     #[sea_orm(primary_key)]
//!     pub id: i32,
//!     #[query(filterable, sortable, searchable)]
//!     pub name: String,
//!     #[query(filterable, sortable)]
//!     pub priority: i32,
//!     #[query(soft_delete)]
//!     pub deleted_at: Option<DateTimeUtc>,
//! }
//!
//! let tags = ResourceDefinition::for_model::<tag::Model>();
//!
//! let builder = QueryBuilder::new(&tags, db.get_database_backend());
//! let descriptor = builder.parse(&body)?;
//! let query = builder.build_query(tag::Entity::find(), &descriptor, Operation::Search)?;
//! ```
//!
//! ## Modules
//!
//! - [`filtering`]: whitelists, request parsing and the constraint engine
//! - [`relations`]: relation metadata and dotted-path resolution
//! - [`builder`]: the per-request orchestrator
//! - [`resource`]: resource definitions and the [`QueryModel`] trait
//! - [`models`]: the query-string request form
//! - [`pagination`]: limit and page resolution

pub mod builder;
pub mod config;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod pagination;
pub mod relations;
pub mod resource;
pub mod validation;

pub use builder::{BuildStage, Operation, QueryBuilder};
pub use config::QueryConfig;
pub use errors::ApiError;
pub use filtering::{
    Combinator, Direction, FilterCondition, FilterDescriptor, FilterGroup, FilterValue, Operator,
    QueryContext, QueryDescriptor, Scalar, ScopeArgs, ScopeDescriptor, ScopeRegistry,
    SearchDescriptor, SortDescriptor, TrashedVisibility, Whitelist, is_whitelisted, parse_request,
};
pub use models::ListParams;
pub use pagination::Pagination;
pub use relations::{FieldReference, ModelCatalog, ModelMeta, PivotTable, RelationKind};
pub use resource::{QueryModel, ResourceDefinition};
pub use validation::{ValidationError, ValidationErrors};

#[cfg(feature = "derive")]
pub use crudquery_derive::QueryModel;
