//! Named, pre-registered query modifiers.
//!
//! A scope is a closure that receives the positional parameters of one
//! `{"name": ..., "parameters": [...]}` entry and returns a [`Condition`]. Every
//! applied scope is AND-ed into the query.
//!
//! ```rust,ignore
//! let mut scopes = ScopeRegistry::new();
//! scopes.register("popular", |args| {
//!     let min = args.int(0)?;
//!     Ok(Condition::all().add(Expr::col((Alias::new("tags"), Alias::new("priority"))).gte(min)))
//! });
//! ```

use sea_orm::Condition;
use serde_json::Value;
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::descriptors::{Scalar, ScopeDescriptor};
use super::params::parse_boolean_like;
use crate::errors::ApiError;

/// Signature shared by every registered scope.
pub type ScopeFn = dyn Fn(&ScopeArgs<'_>) -> Result<Condition, ApiError> + Send + Sync;

/// Scope name to implementation, one registry per resource.
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    scopes: BTreeMap<String, Arc<ScopeFn>>,
}

impl ScopeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `scope` under `name`, replacing any previous registration.
    pub fn register<F>(&mut self, name: impl Into<String>, scope: F)
    where
        F: Fn(&ScopeArgs<'_>) -> Result<Condition, ApiError> + Send + Sync + 'static,
    {
        self.scopes.insert(name.into(), Arc::new(scope));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<ScopeFn>> {
        self.scopes.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Positional parameters of one scope entry.
///
/// The typed getters report failures as 422 errors on
/// `scopes.<position>.parameters.<index>`.
#[derive(Debug, Clone, Copy)]
pub struct ScopeArgs<'a> {
    position: usize,
    name: &'a str,
    parameters: &'a [Value],
}

impl<'a> ScopeArgs<'a> {
    #[must_use]
    pub fn new(position: usize, name: &'a str, parameters: &'a [Value]) -> Self {
        Self {
            position,
            name,
            parameters,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// The raw parameter, `None` when absent
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.parameters.get(index)
    }

    fn path(&self, index: usize) -> String {
        format!("scopes.{}.parameters.{index}", self.position)
    }

    fn required(&self, index: usize) -> Result<&'a Value, ApiError> {
        self.get(index)
            .ok_or_else(|| ApiError::invalid(self.path(index), "The parameter is required"))
    }

    fn mismatch(&self, index: usize, expected: &str) -> ApiError {
        ApiError::invalid(self.path(index), format!("The parameter must be {expected}"))
    }

    /// # Errors
    ///
    /// Returns a 422 when the parameter is missing or not a string.
    pub fn string(&self, index: usize) -> Result<String, ApiError> {
        self.required(index)?
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| self.mismatch(index, "a string"))
    }

    /// Integers and integral strings.
    ///
    /// # Errors
    ///
    /// Returns a 422 when the parameter is missing or not an integer.
    pub fn int(&self, index: usize) -> Result<i64, ApiError> {
        let parsed = match self.required(index)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.mismatch(index, "an integer"))
    }

    /// # Errors
    ///
    /// Returns a 422 when the parameter is missing or not numeric.
    pub fn float(&self, index: usize) -> Result<f64, ApiError> {
        let parsed = match self.required(index)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| self.mismatch(index, "a number"))
    }

    /// # Errors
    ///
    /// Returns a 422 when the parameter is missing or not boolean-like.
    pub fn bool(&self, index: usize) -> Result<bool, ApiError> {
        parse_boolean_like(self.required(index)?).ok_or_else(|| self.mismatch(index, "a boolean"))
    }

    /// Any scalar, for passing straight into a predicate.
    ///
    /// # Errors
    ///
    /// Returns a 422 when the parameter is missing, null, an array or an object.
    pub fn scalar(&self, index: usize) -> Result<Scalar, ApiError> {
        Scalar::from_json(self.required(index)?).ok_or_else(|| self.mismatch(index, "a scalar"))
    }
}

/// AND every requested scope into one condition, in request order.
///
/// # Errors
///
/// - 500 when a scope is exposed but not registered
/// - whatever the scope itself returns, usually a 422 from [`ScopeArgs`]
pub fn build_scopes(
    scopes: &[ScopeDescriptor],
    registry: &ScopeRegistry,
) -> Result<Option<Condition>, ApiError> {
    if scopes.is_empty() {
        return Ok(None);
    }

    let mut condition = Condition::all();
    for (position, scope) in scopes.iter().enumerate() {
        let apply = registry.get(&scope.name).ok_or_else(|| {
            ApiError::resolution(format!(
                "scope '{}' is exposed but not registered",
                scope.name
            ))
        })?;
        let args = ScopeArgs::new(position, &scope.name, &scope.parameters);
        condition = condition.add(apply(&args)?);
    }

    Ok(Some(condition))
}
