//! Substring search across the searchable fields of a resource.
//!
//! One predicate is built per searchable field and the predicates are
//! OR-combined into a single group. Relation fields (`team.name`) are matched
//! through the same correlated `EXISTS` subqueries as relation filters.
//!
//! Case-insensitive search lowercases both sides, which behaves the same on
//! every backend. Case-sensitive search needs a backend-specific form because
//! `SQLite` and `MySQL` compare `LIKE` case-insensitively by default.

use sea_orm::{
    Condition, DatabaseBackend,
    sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr},
};

use super::constraints::relation_exists;
use super::descriptors::SearchDescriptor;
use super::whitelist::WILDCARD;
use super::{QueryContext, column};
use crate::errors::ApiError;
use crate::relations::{FieldReference, PIVOT};

/// Escape LIKE wildcards so the term only ever matches literally
/// Escapes: % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\") // Escape backslash first
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `%term%` with wildcards in `term` escaped
fn contains_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like_wildcards(term))).escape('\\')
}

/// Whether `target` contains `term`.
#[must_use]
pub fn text_predicate(
    target: Expr,
    term: &str,
    case_sensitive: bool,
    backend: DatabaseBackend,
) -> SimpleExpr {
    if !case_sensitive {
        return Expr::expr(Func::lower(target)).like(contains_pattern(&term.to_lowercase()));
    }

    match backend {
        DatabaseBackend::Postgres => target.like(contains_pattern(term)),
        DatabaseBackend::MySql => {
            Expr::expr(target.cast_as(Alias::new("BINARY"))).like(contains_pattern(term))
        }
        _ => Expr::expr(
            Func::cust(Alias::new("INSTR"))
                .arg(target)
                .arg(Expr::val(term)),
        )
        .gt(0),
    }
}

/// OR-combine a text predicate per searchable field, `None` when no field
/// applies.
///
/// Patterns containing `*` cannot name a concrete column and are skipped, as
/// are `pivot.` fields when the query has no pivot table.
///
/// # Errors
///
/// Returns a resolution error for relation fields the models do not declare.
pub fn build_search(
    search: &SearchDescriptor,
    searchable: &[String],
    ctx: &QueryContext<'_>,
) -> Result<Option<Condition>, ApiError> {
    let mut any = Condition::any();
    let mut matched = 0usize;

    for pattern in searchable {
        if pattern.contains(WILDCARD) {
            tracing::debug!(pattern, "Skipping wildcard searchable pattern");
            continue;
        }

        let reference = FieldReference::parse(pattern);
        let field = reference.field.as_str();
        let term = search.value.as_str();
        let expr = match reference.relation.as_deref() {
            None => text_predicate(
                column(&ctx.root.table, field),
                term,
                search.case_sensitive,
                ctx.backend,
            ),
            Some(PIVOT) => {
                let Some(pivot) = ctx.pivot else {
                    tracing::debug!(pattern, "Skipping pivot search field without a pivot table");
                    continue;
                };
                text_predicate(
                    column(&pivot.table, field),
                    term,
                    search.case_sensitive,
                    ctx.backend,
                )
            }
            Some(path) => {
                let hops = ctx.resolve(path)?;
                relation_exists(&hops, &ctx.root.table, "", &|alias, _| {
                    Ok(Condition::all().add(text_predicate(
                        column(alias, field),
                        term,
                        search.case_sensitive,
                        ctx.backend,
                    )))
                })?
            }
        };

        any = any.add(expr);
        matched += 1;
    }

    Ok((matched > 0).then_some(any))
}
