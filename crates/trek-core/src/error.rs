//! Error types for trek-core

use thiserror::Error;

/// Result type alias using trek-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trek-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required relational or form field is missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Record not found in the local cache or the remote store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote document store failure (network, commit, missing document)
    #[error("Remote store error: {0}")]
    Remote(String),

    /// Currency conversion failed or produced a degenerate amount
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Another submission is still in flight
    #[error("Another operation is already in progress")]
    Busy,

    /// A sync run is already in flight for this user
    #[error("Sync already in progress for user {0}")]
    SyncInProgress(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure comes from talking to something over the network.
    ///
    /// Transient failures are recovered locally on reads; writes propagate them.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Http(_))
    }
}
