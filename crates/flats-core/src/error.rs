//! Error types for the service layer.

use std::time::Duration;

use flats_db::DbError;

/// Errors returned by the catalog services.
///
/// A missing row is not an error: id-keyed operations report it as
/// `Ok(None)` or `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The store failed.
    #[error("store error: {0}")]
    Store(DbError),

    /// The store did not answer within the configured timeout.
    #[error("store operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The caller's input was refused.
    #[error("{message}")]
    Invalid {
        /// Summary of the problem.
        message: String,
        /// Per-field or per-operation failures.
        details: Vec<String>,
    },
}

impl ServiceError {
    /// Input refusal without details.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            details: Vec::new(),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rejected(rejected) => Self::Invalid {
                message: format!("import rejected: {rejected}"),
                details: rejected.details,
            },
            other => Self::Store(other),
        }
    }
}
