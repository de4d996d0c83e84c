//! API error types.

use clientdesk_auth::gateway::error_message;
use thiserror::Error;

/// Errors returned by API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered `401`; the session has already been ended.
    #[error("unauthorized")]
    Unauthorized {
        /// Raw response body, if any.
        body: Option<String>,
    },

    /// The server answered with another non-success status.
    #[error("request failed with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body, if any.
        body: Option<String>,
    },

    /// Transport-level failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Input rejected before sending.
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl ApiError {
    /// Returns the best message for display: the server's own when it sent one.
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized { body } | ApiError::Status { body, .. } => body
                .as_deref()
                .and_then(error_message)
                .unwrap_or_else(|| self.to_string()),
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
