//! Error types for project storage operations

use thiserror::Error;

/// Result type for project storage operations
pub type ProjectStoreResult<T> = Result<T, ProjectStoreError>;

/// Errors that can occur during project storage operations
#[derive(Error, Debug)]
pub enum ProjectStoreError {
    /// Failed to execute a query against the projects table
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to serialize or deserialize the project JSON document
    #[error("Project document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Project document carries a schema version newer than this build understands
    #[error("Unsupported project document version: {0}")]
    UnsupportedVersion(u32),

    /// Project already holds the maximum number of assets
    #[error("Project asset limit of {0} reached")]
    AssetLimitReached(usize),
}
