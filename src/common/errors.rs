//! Error types for the Sidekick crate.

use thiserror::Error;

/// Sidekick error type.
#[derive(Debug, Error)]
pub enum SidekickError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Query text rejected before reaching the backend.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Request rejected before reaching the backend.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
    /// Storage lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    StoragePoisoned,
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// HTTP client error.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for Sidekick operations.
pub type SidekickResult<T> = Result<T, SidekickError>;
