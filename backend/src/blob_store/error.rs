//! Error types for blob store operations

use thiserror::Error;

/// Result type for blob store operations
pub type BlobStoreResult<T> = Result<T, BlobStoreError>;

/// Errors that can occur during blob store operations
#[derive(Error, Debug)]
pub enum BlobStoreError {
    /// Blob service error
    #[error("Blob service error: {0}")]
    Service(String),

    /// Upstream service error (5xx from the store)
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request body exceeded the byte ceiling mid-stream
    #[error("Body exceeded the {0} byte limit")]
    BodyTooLarge(u64),

    /// The request body stream failed before completion
    #[error("Failed to read request body: {0}")]
    BodyRead(String),
}
