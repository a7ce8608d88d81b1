//! Error types for the HTTP layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that is
//! converted into the uniform JSON error body via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation:
//!
//! ```json
//! { "message": "...", "details": ["..."], "timestamp": "..." }
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use flats_core::ServiceError;
use flats_types::{PageError, UnknownSort, describe_validation_errors};
use serde::Serialize;
use tracing::error;

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request was malformed or failed validation.
    #[error("{message}")]
    Validation {
        /// Summary of the failure.
        message: String,
        /// One line per offending field, if any.
        details: Vec<String>,
    },

    /// The requested resource or route does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request could not be served.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// A validation failure without field details.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Vec::new(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Uniform error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
    timestamp: DateTime<Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match self {
            Self::Validation { message, details } => (message, details),
            Self::NotFound(message) | Self::Internal(message) => (message, Vec::new()),
        };

        let body = ErrorBody {
            message,
            details,
            timestamp: Utc::now(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Invalid { message, details } => Self::Validation { message, details },
            other => {
                error!("Request failed: {other}");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            message: String::from("validation failed"),
            details: describe_validation_errors(&errors),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<UnknownSort> for ApiError {
    fn from(err: UnknownSort) -> Self {
        Self::bad_request(err.to_string())
    }
}
