//! Error handling for CRUD pipelines.
//!
//! Every failure a pipeline can produce funnels into [`ApiError`], which maps
//! to an HTTP status code and a sanitized response body. Internal details
//! (database errors, misconfigured filter keys) are logged via `tracing` and
//! never sent to clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::filter::FilterError;
use crate::schema::ValidationErrors;

/// API error type with automatic logging and sanitized responses.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - the resource doesn't exist
    NotFound {
        /// Resource name (e.g. "widget")
        resource: String,
        /// Optional id that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - malformed input from the client
    BadRequest { message: String },

    /// 422 Unprocessable Entity - schema validation failed
    ValidationFailed { errors: Vec<String> },

    /// 500 Internal Server Error - database failure (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error - generic internal failure
    Internal {
        message: String,
        internal: Option<String>,
    },

    /// Any other status code
    Custom {
        status: StatusCode,
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    /// Create a 404 Not Found error.
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a 422 Validation Failed error.
    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Create a 500 Internal Server Error from a database error.
    ///
    /// The database error details are logged but NOT sent to the user.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a 500 Internal Server Error with optional internal details.
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Create an error with an arbitrary status code.
    pub fn custom(
        status: StatusCode,
        message: impl Into<String>,
        internal: Option<String>,
    ) -> Self {
        Self::Custom {
            status,
            message: message.into(),
            internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Custom { status, .. } => *status,
        }
    }

    /// User-facing message (sanitized).
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => {
                if let Some(id) = id {
                    format!("{resource} with id '{id}' not found")
                } else {
                    format!("{resource} not found")
                }
            }
            Self::BadRequest { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. }
            | Self::Custom { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => {
                if errors.len() == 1 {
                    errors[0].clone()
                } else {
                    format!("Validation failed: {}", errors.join(", "))
                }
            }
        }
    }

    /// Log internal error details. Only produces output if the caller has
    /// installed a `tracing` subscriber.
    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "database error");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "internal error");
            }
            Self::Custom {
                internal: Some(details),
                status,
                ..
            } => {
                tracing::error!(status = %status, details = %details, "request failed");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error body sent to clients (sanitized).
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Per-field validation errors, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
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

/// `DbErr::RecordNotFound` becomes 404; every other database failure is a 500
/// with the original error logged server-side.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::Database {
                message: "A database error occurred".to_string(),
                internal: err,
            },
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors.errors().iter().map(ToString::to_string).collect(),
        }
    }
}

/// Malformed filter keys are integrator mistakes, not client errors: the key
/// already passed the query schema, so the schema itself is misconfigured.
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::Internal {
            message: "Internal server error".to_string(),
            internal: Some(err.to_string()),
        }
    }
}
