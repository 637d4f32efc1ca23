//! Query orchestration.
//!
//! [`QueryBuilder::build_query`] runs once per request and applies the
//! validated [`QueryDescriptor`] to a Sea-ORM query in a fixed order:
//!
//! ```text
//! Start → ScopesApplied → FiltersApplied → SearchApplied → SortApplied → SoftDeleteApplied → Done
//! ```
//!
//! List operations run every stage. Detail operations (show, update, destroy,
//! restore) only apply soft-delete visibility.
//!
//! ```rust,ignore
//! let builder = QueryBuilder::new(&state.tags, db.get_database_backend());
//! let descriptor = builder.parse(&body)?;
//! let pagination = builder.paginate(&body);
//! let query = builder.build_query(tag::Entity::find(), &descriptor, Operation::Search)?;
//! let rows = query
//!     .limit(pagination.limit)
//!     .offset(pagination.offset())
//!     .all(&db)
//!     .await?;
//! ```

use sea_orm::{DatabaseBackend, QueryTrait, sea_query::SelectStatement};
use serde_json::Value;
use std::fmt;

use crate::errors::ApiError;
use crate::filtering::{
    QueryContext, QueryDescriptor, SearchDescriptor, SortDescriptor, TrashedVisibility,
    apply_sorting, build_filters, build_scopes, build_search, column, parse_request,
};
use crate::filtering::{FilterDescriptor, ScopeDescriptor};
use crate::pagination::Pagination;
use crate::relations::PivotTable;
use crate::resource::ResourceDefinition;

/// The kind of request a query is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Index,
    Search,
    Show,
    Update,
    Destroy,
    Restore,
}

impl Operation {
    /// Whether the operation returns a collection and so takes the list stages.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(self, Self::Index | Self::Search)
    }

    /// The trashed visibility the operation runs with. A restore targets
    /// soft-deleted rows, so it sees them unless the request asks for
    /// trashed rows only.
    #[must_use]
    pub const fn trashed_visibility(self, requested: TrashedVisibility) -> TrashedVisibility {
        match (self, requested) {
            (Self::Restore, TrashedVisibility::Only) => TrashedVisibility::Only,
            (Self::Restore, _) => TrashedVisibility::Include,
            (_, requested) => requested,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Search => "search",
            Self::Show => "show",
            Self::Update => "update",
            Self::Destroy => "destroy",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one [`QueryBuilder::build_query`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Start,
    ScopesApplied,
    FiltersApplied,
    SearchApplied,
    SortApplied,
    SoftDeleteApplied,
    Done,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ScopesApplied => "scopes_applied",
            Self::FiltersApplied => "filters_applied",
            Self::SearchApplied => "search_applied",
            Self::SortApplied => "sort_applied",
            Self::SoftDeleteApplied => "soft_delete_applied",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Builds queries for one resource.
///
/// Cheap to create: construct one per request around the shared
/// [`ResourceDefinition`].
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    definition: &'a ResourceDefinition,
    backend: DatabaseBackend,
    pivot: Option<PivotTable>,
}

impl<'a> QueryBuilder<'a> {
    #[must_use]
    pub fn new(definition: &'a ResourceDefinition, backend: DatabaseBackend) -> Self {
        Self {
            definition,
            backend,
            pivot: None,
        }
    }

    /// Build queries for a many-to-many listing, where `pivot.<column>`
    /// fields refer to `pivot`.
    #[must_use]
    pub fn with_pivot(mut self, pivot: PivotTable) -> Self {
        self.pivot = Some(pivot);
        self
    }

    #[must_use]
    pub fn definition(&self) -> &ResourceDefinition {
        self.definition
    }

    #[must_use]
    pub fn context(&self) -> QueryContext<'_> {
        let context = QueryContext::new(
            self.backend,
            self.definition.model(),
            self.definition.catalog(),
        );
        match &self.pivot {
            Some(pivot) => context.with_pivot(pivot),
            None => context,
        }
    }

    /// Validate a raw request body against the resource.
    ///
    /// # Errors
    ///
    /// See [`parse_request`].
    pub fn parse(&self, raw: &Value) -> Result<QueryDescriptor, ApiError> {
        parse_request(
            raw,
            self.definition.whitelist(),
            self.definition.query_config(),
        )
    }

    /// Page size and number requested by `raw`.
    #[must_use]
    pub fn paginate(&self, raw: &Value) -> Pagination {
        Pagination::from_request(
            raw,
            self.definition.default_limit(),
            self.definition.query_config().max_limit,
        )
    }

    /// Apply `descriptor` to `query` for `operation` and hand the query back.
    ///
    /// Each call adds its predicates again: building the same query twice
    /// repeats every clause.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage. Nothing is partially returned.
    pub fn build_query<Q>(
        &self,
        mut query: Q,
        descriptor: &QueryDescriptor,
        operation: Operation,
    ) -> Result<Q, ApiError>
    where
        Q: QueryTrait<QueryStatement = SelectStatement>,
    {
        let select = query.query();
        self.log_stage(BuildStage::Start, operation);

        if operation.is_list() {
            self.apply_scopes(select, &descriptor.scopes)?;
            self.log_stage(BuildStage::ScopesApplied, operation);

            self.apply_filters(select, &descriptor.filters)?;
            self.log_stage(BuildStage::FiltersApplied, operation);

            if let Some(search) = &descriptor.search {
                self.apply_search(select, search)?;
            }
            self.log_stage(BuildStage::SearchApplied, operation);

            self.apply_sorting(select, &descriptor.sort)?;
            self.log_stage(BuildStage::SortApplied, operation);
        }

        self.apply_soft_deletes(select, operation.trashed_visibility(descriptor.trashed));
        self.log_stage(BuildStage::SoftDeleteApplied, operation);

        self.log_stage(BuildStage::Done, operation);
        Ok(query)
    }

    /// # Errors
    ///
    /// See [`build_scopes`].
    pub fn apply_scopes(
        &self,
        select: &mut SelectStatement,
        scopes: &[ScopeDescriptor],
    ) -> Result<(), ApiError> {
        if let Some(condition) = build_scopes(scopes, self.definition.scopes())? {
            select.cond_where(condition);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`build_filters`].
    pub fn apply_filters(
        &self,
        select: &mut SelectStatement,
        filters: &[FilterDescriptor],
    ) -> Result<(), ApiError> {
        if let Some(condition) = build_filters(filters, &self.context())? {
            select.cond_where(condition);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`build_search`].
    pub fn apply_search(
        &self,
        select: &mut SelectStatement,
        search: &SearchDescriptor,
    ) -> Result<(), ApiError> {
        let searchable = &self.definition.whitelist().searchable_by;
        if let Some(condition) = build_search(search, searchable, &self.context())? {
            select.cond_where(condition);
        }
        Ok(())
    }

    /// Returns whether relation joins were added.
    ///
    /// # Errors
    ///
    /// See [`apply_sorting`].
    pub fn apply_sorting(
        &self,
        select: &mut SelectStatement,
        sort: &[SortDescriptor],
    ) -> Result<bool, ApiError> {
        apply_sorting(select, sort, &self.context())
    }

    /// Restrict `select` to the rows `visibility` allows.
    ///
    /// Returns `false` when the resource has no soft-delete column and nothing
    /// was applied.
    pub fn apply_soft_deletes(
        &self,
        select: &mut SelectStatement,
        visibility: TrashedVisibility,
    ) -> bool {
        let model = self.definition.model();
        let Some(deleted_at) = &model.soft_delete_column else {
            return false;
        };

        let deleted = column(&model.table, deleted_at);
        match visibility {
            TrashedVisibility::Include => {}
            TrashedVisibility::Only => {
                select.and_where(deleted.is_not_null());
            }
            TrashedVisibility::Exclude => {
                select.and_where(deleted.is_null());
            }
        }
        true
    }

    fn log_stage(&self, stage: BuildStage, operation: Operation) {
        tracing::debug!(
            table = self.definition.table(),
            %operation,
            %stage,
            "Query build stage"
        );
    }
}
