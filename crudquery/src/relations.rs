//! Relation metadata and dotted-path resolution.
//!
//! A dotted field reference is split with one rule at every depth: the last
//! segment is the field, everything before it is the relation path.
//!
//! ```text
//! name              -> relation: None,               field: name
//! team.name         -> relation: Some("team"),       field: name
//! team.owner.email  -> relation: Some("team.owner"), field: email
//! pivot.weight      -> relation: Some("pivot"),      field: weight
//! ```
//!
//! Relation paths are walked hop by hop through a [`ModelCatalog`]. Nothing here
//! touches the database.

use sea_orm::{Identity, RelationDef, RelationType, sea_query::{Iden, TableRef}};
use std::collections::BTreeMap;

use crate::errors::ApiError;

/// Relation name that addresses the pivot table of a many-to-many query.
pub const PIVOT: &str = "pivot";

/// How a model reaches a related model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// `related.foreign_key = parent.local_key`, at most one row
    HasOne {
        table: String,
        foreign_key: String,
        local_key: String,
    },
    /// `related.foreign_key = parent.local_key`
    HasMany {
        table: String,
        foreign_key: String,
        local_key: String,
    },
    /// `parent.foreign_key = related.owner_key`
    BelongsTo {
        table: String,
        foreign_key: String,
        owner_key: String,
    },
    /// Through `pivot_table`: `pivot.foreign_pivot_key = parent.parent_key` and
    /// `pivot.related_pivot_key = related.related_key`
    BelongsToMany {
        table: String,
        pivot_table: String,
        foreign_pivot_key: String,
        related_pivot_key: String,
        parent_key: String,
        related_key: String,
    },
    /// `related.morph_id = parent.local_key AND related.morph_type = morph_class`
    MorphOne {
        table: String,
        morph_type: String,
        morph_id: String,
        morph_class: String,
        local_key: String,
    },
    /// Same keys as [`RelationKind::MorphOne`], many rows
    MorphMany {
        table: String,
        morph_type: String,
        morph_id: String,
        morph_class: String,
        local_key: String,
    },
    /// The parent row names its related table in `type_column`, so there is no
    /// fixed table to join.
    MorphTo {
        type_column: String,
        id_column: String,
    },
}

impl RelationKind {
    #[must_use]
    pub fn has_one(table: &str, foreign_key: &str, local_key: &str) -> Self {
        Self::HasOne {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
        }
    }

    #[must_use]
    pub fn has_many(table: &str, foreign_key: &str, local_key: &str) -> Self {
        Self::HasMany {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
        }
    }

    #[must_use]
    pub fn belongs_to(table: &str, foreign_key: &str, owner_key: &str) -> Self {
        Self::BelongsTo {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            owner_key: owner_key.to_string(),
        }
    }

    #[must_use]
    pub fn belongs_to_many(
        table: &str,
        pivot_table: &str,
        foreign_pivot_key: &str,
        related_pivot_key: &str,
    ) -> Self {
        Self::BelongsToMany {
            table: table.to_string(),
            pivot_table: pivot_table.to_string(),
            foreign_pivot_key: foreign_pivot_key.to_string(),
            related_pivot_key: related_pivot_key.to_string(),
            parent_key: "id".to_string(),
            related_key: "id".to_string(),
        }
    }

    /// Polymorphic one-to-one, e.g. `morph_one("images", "imageable", "posts")`
    /// keys on `imageable_type` / `imageable_id`.
    #[must_use]
    pub fn morph_one(table: &str, morph_name: &str, morph_class: &str) -> Self {
        Self::MorphOne {
            table: table.to_string(),
            morph_type: format!("{morph_name}_type"),
            morph_id: format!("{morph_name}_id"),
            morph_class: morph_class.to_string(),
            local_key: "id".to_string(),
        }
    }

    #[must_use]
    pub fn morph_many(table: &str, morph_name: &str, morph_class: &str) -> Self {
        Self::MorphMany {
            table: table.to_string(),
            morph_type: format!("{morph_name}_type"),
            morph_id: format!("{morph_name}_id"),
            morph_class: morph_class.to_string(),
            local_key: "id".to_string(),
        }
    }

    #[must_use]
    pub fn morph_to(morph_name: &str) -> Self {
        Self::MorphTo {
            type_column: format!("{morph_name}_type"),
            id_column: format!("{morph_name}_id"),
        }
    }

    /// Table of the related model, `None` for [`RelationKind::MorphTo`]
    #[must_use]
    pub fn related_table(&self) -> Option<&str> {
        match self {
            Self::HasOne { table, .. }
            | Self::HasMany { table, .. }
            | Self::BelongsTo { table, .. }
            | Self::BelongsToMany { table, .. }
            | Self::MorphOne { table, .. }
            | Self::MorphMany { table, .. } => Some(table),
            Self::MorphTo { .. } => None,
        }
    }

    /// Whether one parent row can match many related rows.
    #[must_use]
    pub const fn is_to_many(&self) -> bool {
        matches!(
            self,
            Self::HasMany { .. } | Self::BelongsToMany { .. } | Self::MorphMany { .. }
        )
    }

    /// Convert a Sea-ORM relation definition.
    ///
    /// `belongs_to` definitions are owned by the other side; `has_one` and
    /// `has_many` are owned by this side. Composite keys and non-table targets
    /// return `None`.
    #[must_use]
    pub fn from_relation_def(def: &RelationDef) -> Option<Self> {
        let table = table_name(&def.to_tbl)?;
        let from_col = single_column(&def.from_col)?;
        let to_col = single_column(&def.to_col)?;

        Some(match (&def.rel_type, def.is_owner) {
            (RelationType::HasOne, false) | (RelationType::HasMany, false) => Self::BelongsTo {
                table,
                foreign_key: from_col,
                owner_key: to_col,
            },
            (RelationType::HasOne, true) => Self::HasOne {
                table,
                foreign_key: to_col,
                local_key: from_col,
            },
            (RelationType::HasMany, true) => Self::HasMany {
                table,
                foreign_key: to_col,
                local_key: from_col,
            },
        })
    }
}

fn table_name(table: &TableRef) -> Option<String> {
    match table {
        TableRef::Table(iden)
        | TableRef::SchemaTable(_, iden)
        | TableRef::DatabaseSchemaTable(_, _, iden)
        | TableRef::TableAlias(iden, _)
        | TableRef::SchemaTableAlias(_, iden, _)
        | TableRef::DatabaseSchemaTableAlias(_, _, iden, _) => Some(Iden::to_string(&**iden)),
        _ => None,
    }
}

fn single_column(identity: &Identity) -> Option<String> {
    match identity {
        Identity::Unary(iden) => Some(Iden::to_string(&**iden)),
        _ => None,
    }
}

/// Join keys for one relation hop.
///
/// For a direct relation `table.foreign_key = parent.local_key`. For a pivot
/// relation the first equality targets the pivot table and [`PivotJoin`]
/// continues to the related table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    pub table: String,
    pub foreign_key: String,
    pub local_key: String,
    pub pivot: Option<PivotJoin>,
    pub morph: Option<MorphConstraint>,
}

/// Second hop of a many-to-many join: `pivot.related_pivot_key = table.related_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotJoin {
    pub table: String,
    pub related_pivot_key: String,
    pub related_key: String,
}

/// `table.column = class`, added to polymorphic joins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphConstraint {
    pub column: String,
    pub class: String,
}

/// Join keys for `kind`, `None` for [`RelationKind::MorphTo`].
#[must_use]
pub fn join_info(kind: &RelationKind) -> Option<JoinInfo> {
    match kind {
        RelationKind::HasOne {
            table,
            foreign_key,
            local_key,
        }
        | RelationKind::HasMany {
            table,
            foreign_key,
            local_key,
        } => Some(JoinInfo {
            table: table.clone(),
            foreign_key: foreign_key.clone(),
            local_key: local_key.clone(),
            pivot: None,
            morph: None,
        }),
        RelationKind::BelongsTo {
            table,
            foreign_key,
            owner_key,
        } => Some(JoinInfo {
            table: table.clone(),
            foreign_key: owner_key.clone(),
            local_key: foreign_key.clone(),
            pivot: None,
            morph: None,
        }),
        RelationKind::BelongsToMany {
            table,
            pivot_table,
            foreign_pivot_key,
            related_pivot_key,
            parent_key,
            related_key,
        } => Some(JoinInfo {
            table: pivot_table.clone(),
            foreign_key: foreign_pivot_key.clone(),
            local_key: parent_key.clone(),
            pivot: Some(PivotJoin {
                table: table.clone(),
                related_pivot_key: related_pivot_key.clone(),
                related_key: related_key.clone(),
            }),
            morph: None,
        }),
        RelationKind::MorphOne {
            table,
            morph_type,
            morph_id,
            morph_class,
            local_key,
        }
        | RelationKind::MorphMany {
            table,
            morph_type,
            morph_id,
            morph_class,
            local_key,
        } => Some(JoinInfo {
            table: table.clone(),
            foreign_key: morph_id.clone(),
            local_key: local_key.clone(),
            pivot: None,
            morph: Some(MorphConstraint {
                column: morph_type.clone(),
                class: morph_class.clone(),
            }),
        }),
        RelationKind::MorphTo { .. } => None,
    }
}

/// Everything before the last segment, `None` for undotted paths.
#[must_use]
pub fn relation_from_path(path: &str) -> Option<String> {
    path.rsplit_once('.').map(|(relation, _)| relation.to_string())
}

/// The last segment of a dotted path.
#[must_use]
pub fn field_from_path(path: &str) -> String {
    path.rsplit_once('.')
        .map_or(path, |(_, field)| field)
        .to_string()
}

/// A dotted field reference split into relation path and field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReference {
    pub relation: Option<String>,
    pub field: String,
    pub qualified: String,
}

impl FieldReference {
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self {
            relation: relation_from_path(path),
            field: field_from_path(path),
            qualified: path.to_string(),
        }
    }

    /// `pivot.<column>`
    #[must_use]
    pub fn is_pivot(&self) -> bool {
        self.relation.as_deref() == Some(PIVOT)
    }
}

/// Query-relevant metadata of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMeta {
    pub table: String,
    pub primary_key: String,
    /// Columns compared by their date part only
    pub date_fields: Vec<String>,
    pub soft_delete_column: Option<String>,
    pub relations: BTreeMap<String, RelationKind>,
}

impl ModelMeta {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    #[must_use]
    pub fn with_date_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.date_fields
            .extend(fields.into_iter().map(|field| field.as_ref().to_string()));
        self
    }

    #[must_use]
    pub fn with_soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_relation(mut self, name: impl Into<String>, kind: RelationKind) -> Self {
        self.relations.insert(name.into(), kind);
        self
    }

    #[must_use]
    pub fn is_date_field(&self, field: &str) -> bool {
        self.date_fields.iter().any(|date| date == field)
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationKind> {
        self.relations.get(name)
    }
}

/// The pivot table of the many-to-many relation a query is listing through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    pub table: String,
    pub date_fields: Vec<String>,
}

impl PivotTable {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            date_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_date_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.date_fields
            .extend(fields.into_iter().map(|field| field.as_ref().to_string()));
        self
    }

    #[must_use]
    pub fn is_date_field(&self, field: &str) -> bool {
        self.date_fields.iter().any(|date| date == field)
    }
}

/// One resolved hop of a relation path.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRelation<'a> {
    /// The relation name of this hop
    pub name: &'a str,
    pub kind: &'a RelationKind,
    /// Model the hop starts from
    pub parent: &'a ModelMeta,
    /// Model the hop lands on, `None` for morph-to
    pub related: Option<&'a ModelMeta>,
}

/// Models reachable through relations, keyed by table.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelMeta>,
}

impl ModelCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, meta: ModelMeta) {
        self.models.insert(meta.table.clone(), meta);
    }

    #[must_use]
    pub fn get(&self, table: &str) -> Option<&ModelMeta> {
        self.models.get(table)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Walk `path` (`team` or `team.owner`) from `root`.
    ///
    /// Relations back to `root`'s own table resolve to `root` itself. A morph-to
    /// hop is returned with `related: None` and must be the last hop.
    ///
    /// # Errors
    ///
    /// Returns a resolution error when a segment is not a relation of its
    /// parent, when the related model is not in the catalog, or when a path
    /// continues past a morph-to hop.
    pub fn resolve_path<'a>(
        &'a self,
        root: &'a ModelMeta,
        path: &'a str,
    ) -> Result<Vec<ResolvedRelation<'a>>, ApiError> {
        let mut hops = Vec::new();
        let mut current = Some(root);

        for name in path.split('.') {
            let Some(parent) = current else {
                return Err(ApiError::resolution(format!(
                    "relation path '{path}' continues past a morph-to relation"
                )));
            };
            let kind = parent.relation(name).ok_or_else(|| {
                ApiError::resolution(format!(
                    "relation '{name}' is not defined on '{}'",
                    parent.table
                ))
            })?;
            let related = match kind.related_table() {
                Some(table) if table == root.table => Some(root),
                Some(table) => Some(self.get(table).ok_or_else(|| {
                    ApiError::resolution(format!(
                        "model '{table}' used by relation '{name}' is not registered"
                    ))
                })?),
                None => None,
            };

            hops.push(ResolvedRelation {
                name,
                kind,
                parent,
                related,
            });
            current = related;
        }

        Ok(hops)
    }
}
