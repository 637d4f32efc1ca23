//! # Error Handling for Query Building
//!
//! Two failure families reach the caller of the query builder:
//!
//! - **Validation errors** (422): the request referenced something the resource
//!   does not allow (unwhitelisted field, unknown operator, nesting too deep).
//!   They are expected, deterministic and fixable by the client, so they are only
//!   logged at debug level and every offending path is returned.
//! - **Resolution errors** (500): the resource definition itself is wrong, for
//!   example a whitelisted relation path that the model does not declare, or an
//!   exposed scope nobody registered. Details are logged, never sent.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crudquery::ApiError;
//!
//! async fn search(
//!     State(state): State<AppState>,
//!     Json(body): Json<serde_json::Value>,
//! ) -> Result<Json<Vec<Tag>>, ApiError> {
//!     let builder = QueryBuilder::new(&state.tags, DatabaseBackend::Postgres);
//!     let descriptor = builder.parse(&body)?;
//!     let query = builder.build_query(tag::Entity::find(), &descriptor, Operation::Search)?;
//!     // execute `query` with your connection
//! }
//! ```
//!
//! ## Logging
//!
//! Internal errors are logged using the `tracing` crate. Install a subscriber in
//! the application to see them:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt().with_target(false).compact().init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::validation::{ValidationError, ValidationErrors};

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - the request could not be read at all
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 422 Unprocessable Entity - the query descriptor failed validation
    ValidationFailed {
        /// Every offending request path with its message
        errors: Vec<ValidationError>,
    },

    /// 500 Internal Server Error - the resource definition cannot satisfy a
    /// validated request (unknown relation, unregistered scope, ...)
    Resolution {
        /// User-facing generic message
        message: String,
        /// What is misconfigured (logged, not sent to user)
        internal: String,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 422 Validation Failed error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::validation_failed(vec![
    ///     ValidationError::new("filters.0.field", "The field is not filterable"),
    /// ]));
    /// ```
    pub fn validation_failed(errors: Vec<ValidationError>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Shorthand for a 422 with a single offending path
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            errors: vec![ValidationError::new(field, message)],
        }
    }

    /// Create a 500 error for a resource definition that cannot serve the request
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::resolution(format!("relation '{name}' is not defined on '{table}'")));
    /// ```
    pub fn resolution(internal: impl Into<String>) -> Self {
        Self::Resolution {
            message: "The resource is not configured to serve this query".to_string(),
            internal: internal.into(),
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Resolution { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Validation errors carried by this error, empty for other variants
    #[must_use]
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }

    /// Get the user-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message }
            | Self::Resolution { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].to_string()
                } else {
                    let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
                    format!("Validation failed: {}", joined.join(", "))
                }
            }
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::Resolution { internal, .. } => {
                tracing::error!(details = %internal, "Resource definition cannot resolve query");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Query rejected"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors),
            },
            other => ErrorResponse {
                error: other.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors.into_vec(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::ValidationFailed {
            errors: vec![error],
        }
    }
}
