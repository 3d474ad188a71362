//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with additional context about which operation failed.

use std::time::Duration;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A storage operation exceeded its time bound.
    #[error("{operation} timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// Name of the operation that timed out.
        operation: &'static str,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// A row or document was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
