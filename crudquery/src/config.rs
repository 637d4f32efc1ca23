//! Query configuration shared by every resource built with it.
//!
//! The struct deserializes with `#[serde(default)]`, so any subset of keys can
//! come from the application's configuration source:
//!
//! ```rust,ignore
//! let config: QueryConfig = serde_json::from_str(r#"{"max_nested_depth": 2}"#)?;
//! ```

use serde::Deserialize;

/// Default maximum number of logical `nested` levels in a filter tree.
pub const DEFAULT_MAX_NESTED_DEPTH: usize = 1;

/// Default page size when a request omits `limit` or sends a non-positive one.
pub const DEFAULT_LIMIT: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Deepest `nested` filter group a request may send.
    pub max_nested_depth: usize,
    /// Search case sensitivity when the request does not specify it.
    pub case_sensitive_search: bool,
    /// Page size used when the resource does not set its own.
    pub default_limit: u64,
    /// Upper bound for a requested page size.
    pub max_limit: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_nested_depth: DEFAULT_MAX_NESTED_DEPTH,
            case_sensitive_search: false,
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
        }
    }
}

impl QueryConfig {
    #[must_use]
    pub fn with_max_nested_depth(mut self, depth: usize) -> Self {
        self.max_nested_depth = depth;
        self
    }

    #[must_use]
    pub fn with_case_sensitive_search(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_search = case_sensitive;
        self
    }

    #[must_use]
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_limit(mut self, limit: u64) -> Self {
        self.max_limit = Some(limit);
        self
    }
}
