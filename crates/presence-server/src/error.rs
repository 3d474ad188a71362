//! Error types for the presence server binary.
//!
//! [`ServerError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the presence server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: presence_core::ConfigError,
    },

    /// Connecting, migrating, or the initial catalog load failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying storage error.
        #[from]
        source: presence_db::DbError,
    },

    /// The HTTP server failed to bind or crashed while serving.
    #[error("http error: {source}")]
    Http {
        /// The underlying server error.
        #[from]
        source: presence_api::ServerError,
    },
}
