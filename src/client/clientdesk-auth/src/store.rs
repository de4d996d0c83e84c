//! Persisted session record.

use std::sync::Arc;

use clientdesk_storage::StorageBackend;
use tracing::{debug, warn};

use crate::AuthError;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Storage key of the server-declared expiry (ISO-8601).
pub const TOKEN_EXPIRES_KEY: &str = "tokenExpires";

/// The `token` / `tokenExpires` pair kept in origin storage.
///
/// Reads never fail: a storage error is logged and reads as "no record".
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn StorageBackend>,
}

impl TokenStore {
    /// Wraps a storage backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Returns the stored token.
    pub async fn get(&self) -> Option<String> {
        self.read(TOKEN_KEY).await
    }

    /// Stores the token.
    pub async fn set(&self, token: &str) -> Result<(), AuthError> {
        self.backend.put_string(TOKEN_KEY, token).await?;
        Ok(())
    }

    /// Returns the stored server-declared expiry.
    pub async fn expires(&self) -> Option<String> {
        self.read(TOKEN_EXPIRES_KEY).await
    }

    /// Stores the server-declared expiry.
    pub async fn set_expires(&self, expires: &str) -> Result<(), AuthError> {
        self.backend.put_string(TOKEN_EXPIRES_KEY, expires).await?;
        Ok(())
    }

    /// Replaces the whole record after a login.
    ///
    /// A missing `expires` removes any expiry left by an earlier session.
    pub async fn replace(&self, token: &str, expires: Option<&str>) -> Result<(), AuthError> {
        match expires {
            Some(expires) => self.set_expires(expires).await?,
            None => self.backend.delete(TOKEN_EXPIRES_KEY).await?,
        }
        self.set(token).await
    }

    /// Removes the token and its expiry.
    pub async fn clear(&self) {
        for key in [TOKEN_KEY, TOKEN_EXPIRES_KEY] {
            if let Err(e) = self.backend.delete(key).await {
                warn!(key, error = %e, "Failed to clear session record");
            }
        }
        debug!("Session record cleared");
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.backend.get_string(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read session record");
                None
            },
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
