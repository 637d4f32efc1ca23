//! Resource definitions.
//!
//! A [`ResourceDefinition`] is everything the query builder knows about one
//! queryable resource: the root model, its whitelists, its scopes, the related
//! models its relation paths can reach and the query configuration. It is built
//! once at startup and shared read-only, usually behind an `Arc` in the
//! application state.
//!
//! ```rust,ignore
//! let tags = ResourceDefinition::for_model::<tag::Model>()
//!     .relation("team", RelationKind::belongs_to("teams", "team_id", "id"))
//!     .related::<team::Model>()
//!     .filterable_by(["team.*"])
//!     .exposed_scopes(["popular"])
//!     .scope("popular", |args| {
//!         Ok(Condition::all().add(Expr::col((tag::Entity, tag::Column::Priority)).gte(args.int(0)?)))
//!     });
//! ```

use sea_orm::Condition;

use crate::config::{DEFAULT_LIMIT, QueryConfig};
use crate::errors::ApiError;
use crate::filtering::scopes::{ScopeArgs, ScopeRegistry};
use crate::filtering::whitelist::Whitelist;
use crate::relations::{ModelCatalog, ModelMeta, RelationKind};

/// Query metadata of one model, usually generated with `#[derive(QueryModel)]`.
pub trait QueryModel {
    const TABLE_NAME: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Column holding the deletion timestamp of soft-deleted rows
    const SOFT_DELETE_COLUMN: Option<&'static str> = None;
    const PAGINATION_LIMIT: u64 = DEFAULT_LIMIT;

    #[must_use]
    fn filterable_fields() -> Vec<&'static str> {
        vec![]
    }

    #[must_use]
    fn sortable_fields() -> Vec<&'static str> {
        vec![]
    }

    #[must_use]
    fn searchable_fields() -> Vec<&'static str> {
        vec![]
    }

    /// Fields compared by their date part only
    #[must_use]
    fn date_fields() -> Vec<&'static str> {
        vec![]
    }
}

impl ModelMeta {
    /// Metadata declared by a [`QueryModel`], without relations.
    #[must_use]
    pub fn of<M: QueryModel>() -> Self {
        let mut meta = Self::new(M::TABLE_NAME)
            .with_primary_key(M::PRIMARY_KEY)
            .with_date_fields(M::date_fields());
        meta.soft_delete_column = M::SOFT_DELETE_COLUMN.map(ToString::to_string);
        meta
    }
}

/// One queryable resource.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    model: ModelMeta,
    whitelist: Whitelist,
    scopes: ScopeRegistry,
    catalog: ModelCatalog,
    config: QueryConfig,
    pagination_limit: Option<u64>,
}

impl ResourceDefinition {
    /// A resource over `model` with empty whitelists.
    #[must_use]
    pub fn new(model: ModelMeta) -> Self {
        Self {
            model,
            whitelist: Whitelist::new(),
            scopes: ScopeRegistry::new(),
            catalog: ModelCatalog::new(),
            config: QueryConfig::default(),
            pagination_limit: None,
        }
    }

    /// A resource seeded from a [`QueryModel`]: table, keys, date and
    /// soft-delete columns, whitelists and page size.
    #[must_use]
    pub fn for_model<M: QueryModel>() -> Self {
        let mut definition = Self::new(ModelMeta::of::<M>())
            .filterable_by(M::filterable_fields())
            .sortable_by(M::sortable_fields())
            .searchable_by(M::searchable_fields());
        if M::PAGINATION_LIMIT != DEFAULT_LIMIT {
            definition.pagination_limit = Some(M::PAGINATION_LIMIT);
        }
        definition
    }

    #[must_use]
    pub fn filterable_by<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist
            .filterable_by
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn sortable_by<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist
            .sortable_by
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn searchable_by<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist
            .searchable_by
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn exposed_scopes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist
            .exposed_scopes
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Register a scope implementation. Registering does not expose it.
    #[must_use]
    pub fn scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&ScopeArgs<'_>) -> Result<Condition, ApiError> + Send + Sync + 'static,
    {
        self.scopes.register(name, scope);
        self
    }

    /// Declare a relation on the root model.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, kind: RelationKind) -> Self {
        self.model.relations.insert(name.into(), kind);
        self
    }

    /// Make a related model reachable by relation paths.
    #[must_use]
    pub fn related_model(mut self, meta: ModelMeta) -> Self {
        self.catalog.insert(meta);
        self
    }

    /// [`ResourceDefinition::related_model`] for a [`QueryModel`] without
    /// relations of its own.
    #[must_use]
    pub fn related<M: QueryModel>(self) -> Self {
        self.related_model(ModelMeta::of::<M>())
    }

    #[must_use]
    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Page size when a request does not ask for one.
    #[must_use]
    pub fn pagination_limit(mut self, limit: u64) -> Self {
        self.pagination_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn model(&self) -> &ModelMeta {
        &self.model
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.model.table
    }

    #[must_use]
    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    #[must_use]
    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn query_config(&self) -> &QueryConfig {
        &self.config
    }

    #[must_use]
    pub fn default_limit(&self) -> u64 {
        self.pagination_limit.unwrap_or(self.config.default_limit)
    }

    /// Model metadata by table, the root included.
    #[must_use]
    pub fn lookup(&self, table: &str) -> Option<&ModelMeta> {
        if table == self.model.table {
            Some(&self.model)
        } else {
            self.catalog.get(table)
        }
    }
}
