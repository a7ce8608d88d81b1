//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

use flats_types::{InvalidImportOperation, UnknownVariant};

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be turned into a domain value.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A batch import was refused; nothing was written.
    #[error("Import rejected: {0}")]
    Rejected(InvalidImportOperation),
}

impl From<UnknownVariant> for DbError {
    fn from(err: UnknownVariant) -> Self {
        Self::Decode(err.to_string())
    }
}
