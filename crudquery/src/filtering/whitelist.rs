//! Field and scope whitelists.
//!
//! A resource declares four independent pattern sets. Each pattern is one of:
//!
//! - an exact name (`name`, `team.name`)
//! - `*`, allowing everything in that set
//! - a nested wildcard (`team.*`), allowing any single field below the prefix
//!
//! Wildcard patterns are matched against the full requested path, so
//! `team.*` allows `team.name` but not `team.owner.name` or `myteam.name`.

use regex::Regex;

/// Allow-all pattern.
pub const WILDCARD: &str = "*";

/// Returns whether `requested` is allowed by any of `allowed`.
#[must_use]
pub fn is_whitelisted<S: AsRef<str>>(requested: &str, allowed: &[S]) -> bool {
    if allowed.iter().any(|pattern| pattern.as_ref() == WILDCARD) {
        return true;
    }
    if allowed.iter().any(|pattern| pattern.as_ref() == requested) {
        return true;
    }
    if !requested.contains('.') {
        return false;
    }

    allowed
        .iter()
        .map(AsRef::as_ref)
        .filter(|pattern| pattern.contains(".*"))
        .filter_map(wildcard_regex)
        .any(|regex| regex.is_match(requested))
}

/// Translate a `prefix.*` pattern into an anchored regex. Literal parts are
/// escaped and every `.*` becomes one `\.(\w+)` segment.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split(".*")
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\.(\w+)");

    match Regex::new(&format!("^{body}$")) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Ignoring unusable whitelist pattern");
            None
        }
    }
}

/// The per-resource allow lists, immutable once the resource is defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    pub filterable_by: Vec<String>,
    pub sortable_by: Vec<String>,
    pub searchable_by: Vec<String>,
    pub exposed_scopes: Vec<String>,
}

impl Whitelist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn can_filter(&self, field: &str) -> bool {
        is_whitelisted(field, &self.filterable_by)
    }

    #[must_use]
    pub fn can_sort(&self, field: &str) -> bool {
        is_whitelisted(field, &self.sortable_by)
    }

    #[must_use]
    pub fn can_search(&self, field: &str) -> bool {
        is_whitelisted(field, &self.searchable_by)
    }

    #[must_use]
    pub fn exposes_scope(&self, name: &str) -> bool {
        is_whitelisted(name, &self.exposed_scopes)
    }
}
