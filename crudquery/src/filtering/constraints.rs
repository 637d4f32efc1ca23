//! Filter trees to conditions.
//!
//! Sibling filters follow SQL precedence: `and` binds tighter than `or`, so
//! `a, or b, c` reads as `a OR (b AND c)`. The type of the first sibling has
//! nothing to bind to and is ignored. The caller ANDs the whole tree into the
//! query as one group, so an `or` filter never loosens scopes or soft-delete
//! visibility.
//!
//! Each leaf is dispatched on its field kind:
//!
//! - **root** `priority` compares `"tags"."priority"` directly
//! - **pivot** `pivot.weight` compares a column of the current pivot table
//! - **relation** `team.owner.email` becomes a correlated `EXISTS` subquery per hop
//!
//! and then on its operator family (comparison, pattern, membership, JSON
//! membership, null, date).

use sea_orm::{
    Condition, DatabaseBackend,
    sea_query::{Alias, Expr, Func, JoinType, Query, SimpleExpr},
};

use super::descriptors::{Combinator, FilterCondition, FilterDescriptor, FilterValue, Operator, Scalar};
use super::{QueryContext, column, relation_alias};
use crate::errors::ApiError;
use crate::relations::{FieldReference, ModelMeta, PIVOT, ResolvedRelation, join_info};

/// Build one condition from a filter list, `None` when nothing applies.
///
/// # Errors
///
/// - resolution errors for unknown relations, morph-to relations and pivot
///   fields outside a pivot context
/// - 422 for operator/value combinations the parser would have rejected
pub fn build_filters(
    filters: &[FilterDescriptor],
    ctx: &QueryContext<'_>,
) -> Result<Option<Condition>, ApiError> {
    let mut groups: Vec<Condition> = Vec::new();
    let mut current: Option<Condition> = None;

    for node in filters {
        let condition = match node {
            FilterDescriptor::Group(group) => build_filters(&group.nested, ctx)?,
            FilterDescriptor::Condition(condition) => Some(leaf(condition, ctx)?),
        };
        let Some(condition) = condition else {
            continue;
        };

        if node.combinator() == Combinator::Or
            && let Some(group) = current.take()
        {
            groups.push(group);
        }
        current = Some(current.unwrap_or_else(Condition::all).add(condition));
    }
    groups.extend(current);

    Ok(match groups.len() {
        0 => None,
        1 => groups.pop(),
        _ => Some(
            groups
                .into_iter()
                .fold(Condition::any(), |any, group| any.add(group)),
        ),
    })
}

/// A column a predicate is applied to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'t> {
    pub table: &'t str,
    pub column: &'t str,
    pub is_date: bool,
}

impl Target<'_> {
    fn expr(&self) -> Expr {
        column(self.table, self.column)
    }
}

fn leaf(condition: &FilterCondition, ctx: &QueryContext<'_>) -> Result<Condition, ApiError> {
    let reference = FieldReference::parse(&condition.field);
    let field = reference.field.as_str();

    match reference.relation.as_deref() {
        None => {
            let target = Target {
                table: &ctx.root.table,
                column: field,
                is_date: ctx.root.is_date_field(field),
            };
            predicate(&target, condition, ctx.backend)
        }
        Some(PIVOT) => {
            let pivot = ctx.pivot.ok_or_else(|| {
                ApiError::resolution(format!(
                    "'{}' needs a pivot table but '{}' is not queried through one",
                    condition.field, ctx.root.table
                ))
            })?;
            let target = Target {
                table: &pivot.table,
                column: field,
                is_date: pivot.is_date_field(field),
            };
            predicate(&target, condition, ctx.backend)
        }
        Some(path) => {
            let hops = ctx.resolve(path)?;
            let exists = relation_exists(&hops, &ctx.root.table, "", &|alias, related| {
                let target = Target {
                    table: alias,
                    column: field,
                    is_date: related.is_date_field(field),
                };
                predicate(&target, condition, ctx.backend)
            })?;
            Ok(Condition::all().add(exists))
        }
    }
}

/// `EXISTS (SELECT 1 FROM <related> AS <alias> WHERE <keys> AND <inner>)`,
/// nested once per hop.
///
/// Each hop is aliased by its relation path (`team`, `team__owner`), pivot
/// tables by the path plus `__pivot`. Soft-deleted related rows never match.
pub(crate) fn relation_exists(
    hops: &[ResolvedRelation<'_>],
    parent_alias: &str,
    prefix: &str,
    inner: &dyn Fn(&str, &ModelMeta) -> Result<Condition, ApiError>,
) -> Result<SimpleExpr, ApiError> {
    let Some((hop, rest)) = hops.split_first() else {
        return Err(ApiError::resolution("empty relation path"));
    };

    let path = if prefix.is_empty() {
        hop.name.to_string()
    } else {
        format!("{prefix}.{}", hop.name)
    };
    let alias = relation_alias(&path);

    let (Some(join), Some(related)) = (join_info(hop.kind), hop.related) else {
        return Err(ApiError::resolution(format!(
            "relation '{path}' on '{}' is morph-to and cannot be constrained",
            hop.parent.table
        )));
    };

    let mut select = Query::select();
    select.expr(Expr::val(1));
    let mut condition = Condition::all();

    if let Some(pivot) = &join.pivot {
        let pivot_alias = format!("{alias}__pivot");
        select
            .from_as(Alias::new(&join.table), Alias::new(&pivot_alias))
            .join_as(
                JoinType::InnerJoin,
                Alias::new(&pivot.table),
                Alias::new(&alias),
                column(&pivot_alias, &pivot.related_pivot_key)
                    .equals((Alias::new(&alias), Alias::new(&pivot.related_key))),
            );
        condition = condition.add(
            column(&pivot_alias, &join.foreign_key)
                .equals((Alias::new(parent_alias), Alias::new(&join.local_key))),
        );
    } else {
        select.from_as(Alias::new(&join.table), Alias::new(&alias));
        condition = condition.add(
            column(&alias, &join.foreign_key)
                .equals((Alias::new(parent_alias), Alias::new(&join.local_key))),
        );
    }

    if let Some(morph) = &join.morph {
        condition = condition.add(column(&alias, &morph.column).eq(morph.class.as_str()));
    }
    if let Some(deleted_at) = &related.soft_delete_column {
        condition = condition.add(column(&alias, deleted_at).is_null());
    }

    let constraint = if rest.is_empty() {
        inner(&alias, related)?
    } else {
        Condition::all().add(relation_exists(rest, &alias, &path, inner)?)
    };
    select.cond_where(condition.add(constraint));

    Ok(Expr::exists(select))
}

/// Apply one operator to `target`.
pub(crate) fn predicate(
    target: &Target<'_>,
    condition: &FilterCondition,
    backend: DatabaseBackend,
) -> Result<Condition, ApiError> {
    let operator = condition.operator;

    let expr = match &condition.value {
        FilterValue::Null => match operator {
            Operator::Eq => target.expr().is_null(),
            Operator::Neq => target.expr().is_not_null(),
            _ => {
                return Err(ApiError::invalid(
                    &condition.field,
                    format!("A null value cannot be used with the '{operator}' operator"),
                ));
            }
        },
        FilterValue::Scalar(scalar) if target.is_date && operator.is_comparison() => compare(
            Expr::expr(date_part(target.expr().into(), backend)),
            operator,
            date_part(Expr::val(sea_orm::Value::from(scalar)).into(), backend),
        ),
        FilterValue::Scalar(scalar) => scalar_predicate(target.expr(), operator, scalar, backend),
        FilterValue::List(values) if operator.is_membership() => {
            return Ok(membership(target, operator, values, backend));
        }
        FilterValue::List(_) => {
            return Err(ApiError::invalid(
                &condition.field,
                format!("An array value cannot be used with the '{operator}' operator"),
            ));
        }
    };

    Ok(Condition::all().add(expr))
}

fn compare(lhs: Expr, operator: Operator, rhs: impl Into<SimpleExpr>) -> SimpleExpr {
    match operator {
        Operator::Lt => lhs.lt(rhs),
        Operator::Lte => lhs.lte(rhs),
        Operator::Gt => lhs.gt(rhs),
        Operator::Gte => lhs.gte(rhs),
        Operator::Neq => lhs.ne(rhs),
        _ => lhs.eq(rhs),
    }
}

fn scalar_predicate(
    lhs: Expr,
    operator: Operator,
    scalar: &Scalar,
    backend: DatabaseBackend,
) -> SimpleExpr {
    let value = sea_orm::Value::from(scalar);
    match operator {
        Operator::Lt
        | Operator::Lte
        | Operator::Gt
        | Operator::Gte
        | Operator::Eq
        | Operator::Neq => compare(lhs, operator, value),
        Operator::Like => lhs.like(scalar_text(scalar)),
        Operator::NotLike => lhs.not_like(scalar_text(scalar)),
        Operator::ILike => Expr::expr(Func::lower(lhs)).like(scalar_text(scalar).to_lowercase()),
        Operator::NotILike => {
            Expr::expr(Func::lower(lhs)).not_like(scalar_text(scalar).to_lowercase())
        }
        Operator::In => lhs.is_in([value]),
        Operator::NotIn => lhs.is_not_in([value]),
        Operator::AllIn | Operator::AnyIn => json_contains(lhs, scalar, backend),
    }
}

fn membership(
    target: &Target<'_>,
    operator: Operator,
    values: &[Scalar],
    backend: DatabaseBackend,
) -> Condition {
    if values.is_empty() {
        // Nothing is in an empty set, and every element of it is.
        let holds = matches!(operator, Operator::NotIn | Operator::AllIn);
        return Condition::all().add(Expr::val(1).eq(if holds { 1 } else { 0 }));
    }

    match operator {
        Operator::AllIn => values.iter().fold(Condition::all(), |all, value| {
            all.add(json_contains(target.expr(), value, backend))
        }),
        Operator::AnyIn => values.iter().fold(Condition::any(), |any, value| {
            any.add(json_contains(target.expr(), value, backend))
        }),
        Operator::NotIn => {
            Condition::all().add(target.expr().is_not_in(values.iter().map(sea_orm::Value::from)))
        }
        _ => Condition::all().add(target.expr().is_in(values.iter().map(sea_orm::Value::from))),
    }
}

/// Whether the JSON array in `lhs` contains `value`.
///
/// Custom templates use the placeholder style of the rendering backend:
/// `$N` for Postgres, `?` elsewhere.
fn json_contains(lhs: Expr, value: &Scalar, backend: DatabaseBackend) -> SimpleExpr {
    match backend {
        DatabaseBackend::Postgres => Expr::cust_with_exprs(
            "$1::jsonb @> $2::jsonb",
            [
                lhs.into(),
                Expr::val(serde_json::Value::Array(vec![value.to_json()]).to_string()).into(),
            ],
        ),
        DatabaseBackend::MySql => Expr::cust_with_exprs(
            "JSON_CONTAINS(?, ?)",
            [lhs.into(), Expr::val(value.to_json().to_string()).into()],
        ),
        _ => Expr::cust_with_exprs(
            "EXISTS (SELECT 1 FROM json_each(?) WHERE json_each.value = ?)",
            [lhs.into(), Expr::val(sea_orm::Value::from(value)).into()],
        ),
    }
}

/// The date part of `expr`.
pub(crate) fn date_part(expr: SimpleExpr, backend: DatabaseBackend) -> SimpleExpr {
    match backend {
        DatabaseBackend::Postgres => expr.cast_as(Alias::new("DATE")),
        _ => SimpleExpr::FunctionCall(Func::cust(Alias::new("DATE")).arg(expr)),
    }
}

fn scalar_text(scalar: &Scalar) -> String {
    match scalar {
        Scalar::String(s) => s.clone(),
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }
}
