use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

use crate::errors::ApiError;
use crate::validation::ValidationErrors;

/// Query-string form of a list request.
///
/// Structured clauses travel as JSON-encoded strings and are decoded into the
/// same body a `POST .../search` request would send:
///
/// ```text
/// GET /tags?filters=[{"field":"priority","operator":">=","value":5}]&sort=[{"field":"name"}]&limit=10
/// ```
///
/// # Filtering
/// `filters` is a JSON array of filter descriptors, optionally nested:
/// ```json
/// [{"field": "name", "operator": "like", "value": "%rust%"},
///  {"type": "or", "nested": [{"field": "priority", "operator": "in", "value": [5, 10]}]}]
/// ```
///
/// # Pagination
/// `limit` is the page size (non-positive values use the resource default) and
/// `page` is 1-based.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// JSON-encoded scope list.
    ///
    /// Example: `[{"name": "popular", "parameters": [5]}]`
    #[param(example = r#"[{"name": "popular", "parameters": [5]}]"#)]
    pub scopes: Option<String>,
    /// JSON-encoded filter list.
    ///
    /// Example: `[{"field": "priority", "operator": ">=", "value": 5}]`
    #[param(example = r#"[{"field": "priority", "operator": ">=", "value": 5}]"#)]
    pub filters: Option<String>,
    /// JSON-encoded search object.
    ///
    /// Example: `{"value": "rust", "case_sensitive": false}`
    #[param(example = r#"{"value": "rust", "case_sensitive": false}"#)]
    pub search: Option<String>,
    /// JSON-encoded sort list.
    ///
    /// Example: `[{"field": "name", "direction": "desc"}]`
    #[param(example = r#"[{"field": "name", "direction": "desc"}]"#)]
    pub sort: Option<String>,
    /// Include soft-deleted rows.
    #[param(example = "true")]
    pub with_trashed: Option<String>,
    /// Only soft-deleted rows.
    #[param(example = "true")]
    pub only_trashed: Option<String>,
    /// Page size.
    ///
    /// Example: `15`
    #[param(example = 15)]
    pub limit: Option<i64>,
    /// Page number (1-based).
    ///
    /// Example: `1`
    #[param(example = 1)]
    pub page: Option<i64>,
}

impl ListParams {
    /// Decode into the JSON body form accepted by
    /// [`parse_request`](crate::filtering::parse_request).
    ///
    /// # Errors
    ///
    /// Returns a 422 naming every parameter that is not valid JSON.
    pub fn into_request(self) -> Result<Value, ApiError> {
        let mut body = Map::new();
        let mut errors = ValidationErrors::new();

        for (key, raw) in [
            ("scopes", self.scopes),
            ("filters", self.filters),
            ("search", self.search),
            ("sort", self.sort),
        ] {
            let Some(raw) = raw else {
                continue;
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    body.insert(key.to_string(), value);
                }
                Err(e) => errors.push(key, format!("The {key} parameter must be valid JSON: {e}")),
            }
        }
        errors.result()?;

        for (key, raw) in [
            ("with_trashed", self.with_trashed),
            ("only_trashed", self.only_trashed),
        ] {
            if let Some(raw) = raw {
                body.insert(key.to_string(), Value::String(raw));
            }
        }
        if let Some(limit) = self.limit {
            body.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(page) = self.page {
            body.insert("page".to_string(), Value::from(page));
        }

        Ok(Value::Object(body))
    }
}
