//! Normalized, validated query descriptors.
//!
//! These are produced by [`parse_request`](super::params::parse_request) from
//! untrusted JSON and consumed by the constraint engine. They live for one
//! query build and are never persisted.

use sea_orm::sea_query::Order;
use std::fmt;

/// How a filter node joins its preceding sibling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            _ => None,
        }
    }
}

/// Filter operators accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    Like,
    NotLike,
    ILike,
    NotILike,
    In,
    NotIn,
    AllIn,
    AnyIn,
}

impl Operator {
    pub const ALL: [Self; 14] = [
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::Eq,
        Self::Neq,
        Self::Like,
        Self::NotLike,
        Self::ILike,
        Self::NotILike,
        Self::In,
        Self::NotIn,
        Self::AllIn,
        Self::AnyIn,
    ];

    /// Parse the wire spelling, e.g. `"not ilike"`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == value)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::ILike => "ilike",
            Self::NotILike => "not ilike",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::AllIn => "all in",
            Self::AnyIn => "any in",
        }
    }

    /// Operators that take a list of values.
    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::AllIn | Self::AnyIn)
    }

    /// Operators with a date-only form on date fields.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Lte | Self::Gt | Self::Gte | Self::Eq | Self::Neq
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single JSON scalar carried by a filter or scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// `None` for null, arrays, objects and integers outside the `i64` range
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) if n.is_f64() => n.as_f64().map(Self::Float),
            serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl From<&Scalar> for sea_orm::Value {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::String(s) => s.clone().into(),
            Scalar::Int(i) => (*i).into(),
            Scalar::Float(f) => (*f).into(),
            Scalar::Bool(b) => (*b).into(),
        }
    }
}

/// The right-hand side of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    Scalar(Scalar),
    List(Vec<Scalar>),
}

/// A leaf predicate: `field operator value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub combinator: Combinator,
    pub field: String,
    pub operator: Operator,
    pub value: FilterValue,
}

/// A parenthesized group of sibling filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub combinator: Combinator,
    pub nested: Vec<FilterDescriptor>,
}

/// One node of the filter tree: either a predicate or a group.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterDescriptor {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl FilterDescriptor {
    #[must_use]
    pub fn combinator(&self) -> Combinator {
        match self {
            Self::Condition(condition) => condition.combinator,
            Self::Group(group) => group.combinator,
        }
    }

    /// Logical nesting depth, 0 for a leaf
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Condition(_) => 0,
            Self::Group(group) => 1 + group.nested.iter().map(Self::depth).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Case-insensitive `asc` / `desc`
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if value.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

impl From<Direction> for Order {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescriptor {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeDescriptor {
    pub name: String,
    pub parameters: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDescriptor {
    pub value: String,
    pub case_sensitive: bool,
}

/// Which soft-deleted rows a query may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrashedVisibility {
    /// Only rows that are not soft-deleted
    #[default]
    Exclude,
    /// Deleted and live rows alike
    Include,
    /// Only soft-deleted rows
    Only,
}

impl TrashedVisibility {
    /// `with_trashed` wins when a request sets both flags.
    #[must_use]
    pub fn from_flags(with_trashed: bool, only_trashed: bool) -> Self {
        if with_trashed {
            Self::Include
        } else if only_trashed {
            Self::Only
        } else {
            Self::Exclude
        }
    }
}

/// Everything a list request asked for, validated against one resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    pub scopes: Vec<ScopeDescriptor>,
    pub filters: Vec<FilterDescriptor>,
    pub search: Option<SearchDescriptor>,
    pub sort: Vec<SortDescriptor>,
    pub trashed: TrashedVisibility,
}
