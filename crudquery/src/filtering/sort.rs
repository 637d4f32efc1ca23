//! Ordering by root, relation and pivot columns.
//!
//! Relation sorts need the related columns in the `FROM` clause, so every hop
//! of the path is LEFT JOINed under an alias named after the relation path:
//!
//! ```text
//! sort: [{"field": "team.owner.name", "direction": "desc"}]
//!
//! SELECT "tags".* FROM "tags"
//!   LEFT JOIN "teams" AS "team" ON "team"."id" = "tags"."team_id"
//!   LEFT JOIN "users" AS "team__owner" ON "team__owner"."id" = "team"."owner_id"
//!   ORDER BY "team__owner"."name" DESC
//! ```
//!
//! Each alias is joined once no matter how many sorts go through it. Once a
//! join is added the selection is reset to `root.*`, so joined columns never
//! collide with root columns when rows are hydrated. Sorting through a to-many
//! relation can repeat root rows, once per related row.

use sea_orm::{
    Condition,
    sea_query::{Alias, Asterisk, JoinType, Order, SelectStatement},
};
use std::collections::BTreeSet;

use super::descriptors::SortDescriptor;
use super::{QueryContext, column, relation_alias};
use crate::errors::ApiError;
use crate::relations::{FieldReference, PIVOT, join_info};

/// Where one sort entry lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortTarget {
    /// `ORDER BY table.column`, `table` being the root, the pivot or a join alias
    Column { table: String, column: String },
    /// Nothing to order by (morph-to relation, pivot field without a pivot table)
    Skipped,
}

/// Aliases already joined into the statement.
#[derive(Debug, Default)]
struct SortJoins {
    joined: BTreeSet<String>,
}

impl SortJoins {
    /// LEFT JOIN every hop of `path`, returning the alias of the last hop, or
    /// `None` when the path crosses a morph-to relation.
    fn join_path(
        &mut self,
        select: &mut SelectStatement,
        path: &str,
        ctx: &QueryContext<'_>,
    ) -> Result<Option<String>, ApiError> {
        let hops = ctx.resolve(path)?;
        let mut parent_alias = ctx.root.table.clone();
        let mut prefix = String::new();

        for hop in &hops {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(hop.name);
            let alias = relation_alias(&prefix);

            let (Some(join), Some(related)) = (join_info(hop.kind), hop.related) else {
                tracing::debug!(relation = %prefix, "Skipping sort through morph-to relation");
                return Ok(None);
            };

            if self.joined.insert(alias.clone()) {
                let mut on = Condition::all();
                if let Some(pivot) = &join.pivot {
                    let pivot_alias = format!("{alias}__pivot");
                    select.join_as(
                        JoinType::LeftJoin,
                        Alias::new(&join.table),
                        Alias::new(&pivot_alias),
                        column(&pivot_alias, &join.foreign_key)
                            .equals((Alias::new(&parent_alias), Alias::new(&join.local_key))),
                    );
                    on = on.add(
                        column(&alias, &pivot.related_key)
                            .equals((Alias::new(&pivot_alias), Alias::new(&pivot.related_pivot_key))),
                    );
                    if let Some(deleted_at) = &related.soft_delete_column {
                        on = on.add(column(&alias, deleted_at).is_null());
                    }
                    select.join_as(
                        JoinType::LeftJoin,
                        Alias::new(&pivot.table),
                        Alias::new(&alias),
                        on,
                    );
                } else {
                    on = on.add(
                        column(&alias, &join.foreign_key)
                            .equals((Alias::new(&parent_alias), Alias::new(&join.local_key))),
                    );
                    if let Some(morph) = &join.morph {
                        on = on.add(column(&alias, &morph.column).eq(morph.class.as_str()));
                    }
                    if let Some(deleted_at) = &related.soft_delete_column {
                        on = on.add(column(&alias, deleted_at).is_null());
                    }
                    select.join_as(JoinType::LeftJoin, Alias::new(&join.table), Alias::new(&alias), on);
                }
            }

            parent_alias = alias;
        }

        Ok(Some(parent_alias))
    }
}

/// Classify one sort field, adding whatever joins it needs.
fn sort_target(
    select: &mut SelectStatement,
    joins: &mut SortJoins,
    field: &str,
    ctx: &QueryContext<'_>,
) -> Result<SortTarget, ApiError> {
    let reference = FieldReference::parse(field);

    Ok(match reference.relation.as_deref() {
        None => SortTarget::Column {
            table: ctx.root.table.clone(),
            column: reference.field,
        },
        Some(PIVOT) => match ctx.pivot {
            Some(pivot) => SortTarget::Column {
                table: pivot.table.clone(),
                column: reference.field,
            },
            None => {
                tracing::debug!(field, "Skipping pivot sort without a pivot table");
                SortTarget::Skipped
            }
        },
        Some(path) => match joins.join_path(select, path, ctx)? {
            Some(alias) => SortTarget::Column {
                table: alias,
                column: reference.field,
            },
            None => SortTarget::Skipped,
        },
    })
}

/// Apply every sort entry in request order.
///
/// Returns whether relation joins were added.
///
/// # Errors
///
/// Returns a resolution error for relation paths the models do not declare.
pub fn apply_sorting(
    select: &mut SelectStatement,
    sort: &[SortDescriptor],
    ctx: &QueryContext<'_>,
) -> Result<bool, ApiError> {
    let mut joins = SortJoins::default();

    for descriptor in sort {
        if let SortTarget::Column { table, column } =
            sort_target(select, &mut joins, &descriptor.field, ctx)?
        {
            select.order_by(
                (Alias::new(table), Alias::new(column)),
                Order::from(descriptor.direction),
            );
        }
    }

    if joins.joined.is_empty() {
        return Ok(false);
    }

    select
        .clear_selects()
        .column((Alias::new(&ctx.root.table), Asterisk));
    Ok(true)
}
