//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing store could not be opened.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A read or write against the backing store failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Caller supplied an unusable key or origin.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stored bytes could not be interpreted.
    #[error("serialization error: {0}")]
    Serialization(String),
}
