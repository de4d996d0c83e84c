//! Authentication error types.

use clientdesk_storage::StorageError;
use thiserror::Error;

/// Errors that can occur in the session layer.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login form input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Route resolution kept redirecting between views.
    #[error("redirect loop while resolving {0}")]
    RedirectLoop(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
