//! Request parsing and validation.
//!
//! [`parse_request`] turns the raw JSON body of a list/search request into a
//! [`QueryDescriptor`]. It runs in two phases:
//!
//! 1. **Depth guard**: the nesting of the `filters` tree is measured before
//!    anything else is looked at. A logical filter level costs two JSON levels
//!    (the list, then the descriptor holding `nested`), so the logical depth is
//!    half the container depth. Anything deeper than
//!    [`QueryConfig::max_nested_depth`] is rejected outright.
//! 2. **Rule validation**: every scope, filter node, sort entry and the search
//!    block is checked against its whitelist and shape rules. All failures are
//!    collected; nothing is returned unless every rule passed.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use super::descriptors::{
    Combinator, Direction, FilterCondition, FilterDescriptor, FilterGroup, FilterValue, Operator,
    QueryDescriptor, Scalar, ScopeDescriptor, SearchDescriptor, SortDescriptor, TrashedVisibility,
};
use super::whitelist::Whitelist;
use crate::config::QueryConfig;
use crate::errors::ApiError;
use crate::validation::ValidationErrors;

static FIELD_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[\w.>-]+$").unwrap()
});

/// Whether `field` only uses word characters, dots, dashes and `>`.
#[must_use]
pub fn is_valid_field_format(field: &str) -> bool {
    FIELD_FORMAT.is_match(field)
}

const OUT_OF_RANGE: &str = "The value is out of range";

/// An integer too large for a signed 64-bit column.
fn is_out_of_range(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_u64() && n.as_i64().is_none())
}

/// Container depth below `value`, counting arrays and objects alike. The
/// contents of a filter's `value` key do not count, so membership lists never
/// make a filter look nested.
#[must_use]
pub fn container_depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|item| is_container(item))
            .map(|item| container_depth(item) + 1)
            .max()
            .unwrap_or(0),
        Value::Object(map) => map
            .iter()
            .filter(|(key, item)| key.as_str() != "value" && is_container(item))
            .map(|(_, item)| container_depth(item) + 1)
            .max()
            .unwrap_or(0),
        _ => 0,
    }
}

fn is_container(value: &Value) -> bool {
    value.is_array() || value.is_object()
}

/// Logical nesting depth of a raw `filters` list.
#[must_use]
pub fn filter_depth(filters: &Value) -> usize {
    container_depth(filters) / 2
}

/// Reject `filters` trees deeper than the configured ceiling.
///
/// # Errors
///
/// Returns a 422 naming the configured maximum.
pub fn check_filter_depth(filters: &Value, max_nested_depth: usize) -> Result<(), ApiError> {
    if filter_depth(filters) > max_nested_depth {
        return Err(ApiError::invalid(
            "filters",
            format!("Max nested depth {max_nested_depth} is exceeded"),
        ));
    }
    Ok(())
}

/// Accepts booleans, `0`/`1` and the usual truthy/falsy strings.
#[must_use]
pub fn parse_boolean_like(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Validate and normalize a raw request body.
///
/// `Null` is treated as an empty request. Keys other than the query clauses
/// (`limit`, `page`, ...) are ignored here.
///
/// # Errors
///
/// - 400 when the body is not an object
/// - 422 with every offending path when any rule fails
pub fn parse_request(
    raw: &Value,
    whitelist: &Whitelist,
    config: &QueryConfig,
) -> Result<QueryDescriptor, ApiError> {
    let body = match raw {
        Value::Null => return Ok(QueryDescriptor::default()),
        Value::Object(body) => body,
        _ => return Err(ApiError::bad_request("Request body must be a JSON object")),
    };

    if let Some(filters) = present(body, "filters") {
        check_filter_depth(filters, config.max_nested_depth)?;
    }

    let mut parser = Parser {
        whitelist,
        errors: ValidationErrors::new(),
    };

    let scopes = present(body, "scopes")
        .map(|raw| parser.scopes(raw))
        .unwrap_or_default();
    let filters = present(body, "filters")
        .map(|raw| parser.filter_list(raw, "filters"))
        .unwrap_or_default();
    let search = present(body, "search").and_then(|raw| parser.search(raw, config));
    let sort = present(body, "sort")
        .map(|raw| parser.sort(raw))
        .unwrap_or_default();
    let with_trashed = parser.flag(body, "with_trashed");
    let only_trashed = parser.flag(body, "only_trashed");

    parser.errors.result()?;

    Ok(QueryDescriptor {
        scopes,
        filters,
        search,
        sort,
        trashed: TrashedVisibility::from_flags(with_trashed, only_trashed),
    })
}

/// `Some` only for keys that exist and are not `null`.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !value.is_null())
}

struct Parser<'a> {
    whitelist: &'a Whitelist,
    errors: ValidationErrors,
}

impl Parser<'_> {
    fn array<'v>(&mut self, raw: &'v Value, path: &str, what: &str) -> Option<&'v Vec<Value>> {
        if let Value::Array(items) = raw {
            Some(items)
        } else {
            self.errors.push(path, format!("The {what} must be an array"));
            None
        }
    }

    fn object<'v>(
        &mut self,
        raw: &'v Value,
        path: &str,
        what: &str,
    ) -> Option<&'v Map<String, Value>> {
        if let Value::Object(map) = raw {
            Some(map)
        } else {
            self.errors.push(path, format!("The {what} must be an object"));
            None
        }
    }

    /// A required, well-formed field path. Whitelist checks are left to the caller.
    fn field(&mut self, node: &Map<String, Value>, path: &str, required: &str) -> Option<String> {
        let field_path = format!("{path}.field");
        match present(node, "field") {
            None => {
                self.errors.push(field_path, required);
                None
            }
            Some(Value::String(field)) if field.contains("->") => {
                self.errors.push(field_path, "JSON paths are not supported");
                None
            }
            Some(Value::String(field)) if is_valid_field_format(field) => Some(field.clone()),
            Some(Value::String(_)) => {
                self.errors.push(field_path, "The field format is invalid");
                None
            }
            Some(_) => {
                self.errors.push(field_path, "The field must be a string");
                None
            }
        }
    }

    fn scopes(&mut self, raw: &Value) -> Vec<ScopeDescriptor> {
        let Some(items) = self.array(raw, "scopes", "scopes") else {
            return Vec::new();
        };

        let mut scopes = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = format!("scopes.{index}");
            let Some(node) = self.object(item, &path, "scope") else {
                continue;
            };

            let name = match present(node, "name") {
                Some(Value::String(name)) if self.whitelist.exposes_scope(name) => Some(name.clone()),
                Some(Value::String(name)) => {
                    self.errors
                        .push(format!("{path}.name"), format!("The scope '{name}' is not exposed"));
                    None
                }
                Some(_) => {
                    self.errors.push(format!("{path}.name"), "The name must be a string");
                    None
                }
                None => {
                    self.errors.push(format!("{path}.name"), "The name is required");
                    None
                }
            };

            let parameters = match present(node, "parameters") {
                None => Some(Vec::new()),
                Some(Value::Array(parameters)) => Some(parameters.clone()),
                Some(_) => {
                    self.errors
                        .push(format!("{path}.parameters"), "The parameters must be an array");
                    None
                }
            };

            if let (Some(name), Some(parameters)) = (name, parameters) {
                scopes.push(ScopeDescriptor { name, parameters });
            }
        }
        scopes
    }

    fn filter_list(&mut self, raw: &Value, path: &str) -> Vec<FilterDescriptor> {
        let what = if path == "filters" { "filters" } else { "nested filters" };
        let Some(items) = self.array(raw, path, what) else {
            return Vec::new();
        };

        items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| self.filter_node(item, &format!("{path}.{index}")))
            .collect()
    }

    fn filter_node(&mut self, raw: &Value, path: &str) -> Option<FilterDescriptor> {
        let node = self.object(raw, path, "filter")?;

        let combinator = match present(node, "type") {
            None => Some(Combinator::And),
            Some(Value::String(kind)) => Combinator::parse(kind),
            Some(_) => None,
        };
        if combinator.is_none() {
            self.errors
                .push(format!("{path}.type"), "The type must be one of: and, or");
        }

        if let Some(nested) = present(node, "nested") {
            // A field next to `nested` is still held to the whitelist.
            if present(node, "field").is_some() {
                self.whitelisted_filter_field(node, path);
            }
            let nested = self.filter_list(nested, &format!("{path}.nested"));
            return Some(FilterDescriptor::Group(FilterGroup {
                combinator: combinator?,
                nested,
            }));
        }

        let field = self.whitelisted_filter_field(node, path);
        let value = self.filter_value(node, path);
        let operator = match present(node, "operator") {
            None => value.as_ref().map(|value| match value {
                FilterValue::List(_) => Operator::In,
                FilterValue::Null | FilterValue::Scalar(_) => Operator::Eq,
            }),
            Some(Value::String(op)) => {
                let parsed = Operator::parse(op);
                if parsed.is_none() {
                    self.invalid_operator(path);
                }
                parsed
            }
            Some(_) => {
                self.invalid_operator(path);
                None
            }
        };

        let (operator, value) = self.reconcile(operator?, value?, path)?;
        Some(FilterDescriptor::Condition(FilterCondition {
            combinator: combinator?,
            field: field?,
            operator,
            value,
        }))
    }

    fn whitelisted_filter_field(&mut self, node: &Map<String, Value>, path: &str) -> Option<String> {
        let field = self.field(node, path, "The field is required when nested is not present")?;
        if self.whitelist.can_filter(&field) {
            Some(field)
        } else {
            self.errors.push(
                format!("{path}.field"),
                format!("The field '{field}' is not filterable"),
            );
            None
        }
    }

    fn invalid_operator(&mut self, path: &str) {
        let allowed: Vec<&str> = Operator::ALL.iter().map(|op| op.as_str()).collect();
        self.errors.push(
            format!("{path}.operator"),
            format!("The operator must be one of: {}", allowed.join(", ")),
        );
    }

    fn filter_value(&mut self, node: &Map<String, Value>, path: &str) -> Option<FilterValue> {
        match node.get("value") {
            None | Some(Value::Null) => Some(FilterValue::Null),
            Some(Value::Array(items)) => {
                let mut scalars = Vec::with_capacity(items.len());
                let mut valid = true;
                for (index, item) in items.iter().enumerate() {
                    if let Some(scalar) = Scalar::from_json(item) {
                        scalars.push(scalar);
                    } else {
                        valid = false;
                        let message = if is_out_of_range(item) {
                            OUT_OF_RANGE
                        } else {
                            "The value must be a scalar"
                        };
                        self.errors.push(format!("{path}.value.{index}"), message);
                    }
                }
                valid.then_some(FilterValue::List(scalars))
            }
            Some(value) => {
                if let Some(scalar) = Scalar::from_json(value) {
                    Some(FilterValue::Scalar(scalar))
                } else {
                    let message = if is_out_of_range(value) {
                        OUT_OF_RANGE
                    } else {
                        "The value must be a scalar or an array of scalars"
                    };
                    self.errors.push(format!("{path}.value"), message);
                    None
                }
            }
        }
    }

    /// Enforce operator/value compatibility. A scalar given to a membership
    /// operator becomes a one-element list.
    fn reconcile(
        &mut self,
        operator: Operator,
        value: FilterValue,
        path: &str,
    ) -> Option<(Operator, FilterValue)> {
        match value {
            FilterValue::Null if !matches!(operator, Operator::Eq | Operator::Neq) => {
                self.errors.push(
                    format!("{path}.value"),
                    format!("A null value cannot be used with the '{operator}' operator"),
                );
                None
            }
            FilterValue::List(_) if !operator.is_membership() => {
                self.errors.push(
                    format!("{path}.value"),
                    format!("An array value cannot be used with the '{operator}' operator"),
                );
                None
            }
            FilterValue::Scalar(scalar) if operator.is_membership() => {
                Some((operator, FilterValue::List(vec![scalar])))
            }
            value => Some((operator, value)),
        }
    }

    fn sort(&mut self, raw: &Value) -> Vec<SortDescriptor> {
        let Some(items) = self.array(raw, "sort", "sort") else {
            return Vec::new();
        };

        let mut sorts = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = format!("sort.{index}");
            let Some(node) = self.object(item, &path, "sort") else {
                continue;
            };

            let field = self
                .field(node, &path, "The field is required")
                .and_then(|field| {
                    if self.whitelist.can_sort(&field) {
                        Some(field)
                    } else {
                        self.errors.push(
                            format!("{path}.field"),
                            format!("The field '{field}' is not sortable"),
                        );
                        None
                    }
                });

            let direction = match present(node, "direction") {
                None => Some(Direction::Asc),
                Some(Value::String(direction)) => Direction::parse(direction),
                Some(_) => None,
            };
            if direction.is_none() {
                self.errors
                    .push(format!("{path}.direction"), "The direction must be one of: asc, desc");
            }

            if let (Some(field), Some(direction)) = (field, direction) {
                sorts.push(SortDescriptor { field, direction });
            }
        }
        sorts
    }

    fn search(&mut self, raw: &Value, config: &QueryConfig) -> Option<SearchDescriptor> {
        let node = self.object(raw, "search", "search")?;

        let case_sensitive = match present(node, "case_sensitive") {
            None => Some(config.case_sensitive_search),
            Some(value) => {
                let parsed = parse_boolean_like(value);
                if parsed.is_none() {
                    self.errors
                        .push("search.case_sensitive", "The case sensitive flag must be a boolean");
                }
                parsed
            }
        };

        let value = match present(node, "value") {
            None => None,
            Some(Value::String(value)) => Some(value.clone()),
            Some(_) => {
                self.errors.push("search.value", "The value must be a string");
                None
            }
        };

        match (value, case_sensitive) {
            (Some(value), Some(case_sensitive)) if !value.is_empty() => Some(SearchDescriptor {
                value,
                case_sensitive,
            }),
            _ => None,
        }
    }

    fn flag(&mut self, body: &Map<String, Value>, key: &str) -> bool {
        match present(body, key) {
            None => false,
            Some(value) => parse_boolean_like(value).unwrap_or_else(|| {
                self.errors.push(key, "The flag must be a boolean");
                false
            }),
        }
    }
}
