//! Error types for folio-core

use thiserror::Error;

/// Result type alias using folio-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in folio-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Timeout or connection failure talking to the content API
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// Content API answered with a body of the wrong shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A stored cache value could not be parsed
    #[error("Cache corrupted: {0}")]
    CacheCorrupted(String),

    /// The content API (or local pre-validation) rejected a write
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    /// Serialized payload exceeds the write limit
    #[error("Payload too large: {actual} bytes (limit {limit})")]
    PayloadTooLarge { limit: usize, actual: usize },

    /// Missing or rejected admin credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
