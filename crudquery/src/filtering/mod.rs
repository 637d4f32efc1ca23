//! # Filtering, Search, Sort & Scopes
//!
//! This module turns an untrusted JSON query descriptor into predicates, joins
//! and orderings on a Sea-ORM `SelectStatement`.
//!
//! ## Request Shape
//!
//! ```json
//! {
//!   "scopes":  [{"name": "popular", "parameters": [5]}],
//!   "filters": [
//!     {"field": "name", "operator": "like", "value": "%rust%"},
//!     {"type": "or", "nested": [
//!       {"field": "team.name", "operator": "=", "value": "core"},
//!       {"field": "priority", "operator": "in", "value": [5, 10]}
//!     ]}
//!   ],
//!   "search":  {"value": "rust", "case_sensitive": false},
//!   "sort":    [{"field": "team.name", "direction": "desc"}],
//!   "with_trashed": true
//! }
//! ```
//!
//! ## Main Components
//!
//! - **[`whitelist`]**: exact, `*` and `relation.*` allow lists
//! - **[`params`]**: depth guard and rule validation, producing a [`QueryDescriptor`]
//! - **[`constraints`]**: filter trees to conditions, relation `EXISTS` subqueries
//! - **[`search`]**: OR-combined substring search across searchable fields
//! - **[`sort`]**: root, relation (joined) and pivot orderings
//! - **[`scopes`]**: named, registered query modifiers
//!
//! ## Database Differences
//!
//! | concern                 | `SQLite`                 | `PostgreSQL`             | `MySQL`                   |
//! |-------------------------|--------------------------|--------------------------|---------------------------|
//! | date-only comparison    | `DATE(col)`              | `CAST(col AS DATE)`      | `DATE(col)`               |
//! | case-sensitive search   | `INSTR(col, term) > 0`   | `col LIKE '%term%'`      | `CAST(col AS BINARY) LIKE` |
//! | `all in` / `any in`     | `json_each(col)`         | `col::jsonb @> ...`      | `JSON_CONTAINS(col, ...)` |

use sea_orm::{
    DatabaseBackend,
    sea_query::{Alias, Expr},
};

use crate::errors::ApiError;
use crate::relations::{ModelCatalog, ModelMeta, PivotTable, ResolvedRelation};

pub mod constraints;
pub mod descriptors;
pub mod params;
pub mod scopes;
pub mod search;
pub mod sort;
pub mod whitelist;

pub use constraints::build_filters;
pub use descriptors::{
    Combinator, Direction, FilterCondition, FilterDescriptor, FilterGroup, FilterValue, Operator,
    QueryDescriptor, Scalar, ScopeDescriptor, SearchDescriptor, SortDescriptor, TrashedVisibility,
};
pub use params::{check_filter_depth, filter_depth, parse_request};
pub use scopes::{ScopeArgs, ScopeFn, ScopeRegistry, build_scopes};
pub use search::build_search;
pub use sort::apply_sorting;
pub use whitelist::{Whitelist, is_whitelisted};

/// What the constraint engine needs to know about the query being built.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub backend: DatabaseBackend,
    pub root: &'a ModelMeta,
    pub catalog: &'a ModelCatalog,
    pub pivot: Option<&'a PivotTable>,
}

impl<'a> QueryContext<'a> {
    #[must_use]
    pub fn new(backend: DatabaseBackend, root: &'a ModelMeta, catalog: &'a ModelCatalog) -> Self {
        Self {
            backend,
            root,
            catalog,
            pivot: None,
        }
    }

    /// Allow `pivot.<column>` references against `pivot`.
    #[must_use]
    pub fn with_pivot(mut self, pivot: &'a PivotTable) -> Self {
        self.pivot = Some(pivot);
        self
    }

    /// Walk a relation path from the root model.
    ///
    /// # Errors
    ///
    /// Returns a resolution error for relations the models do not declare.
    pub fn resolve<'p>(&self, path: &'p str) -> Result<Vec<ResolvedRelation<'p>>, ApiError>
    where
        'a: 'p,
    {
        self.catalog.resolve_path(self.root, path)
    }
}

/// SQL alias for a relation path: `team.owner` becomes `team__owner`.
#[must_use]
pub fn relation_alias(path: &str) -> String {
    path.replace('.', "__")
}

/// `"table"."column"`
pub(crate) fn column(table: &str, column: &str) -> Expr {
    Expr::col((Alias::new(table), Alias::new(column)))
}
