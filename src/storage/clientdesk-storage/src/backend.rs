//! Storage backend trait definition.

use async_trait::async_trait;

use crate::error::StorageError;

/// Key/value storage scoped to a single client origin.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a value with a key, replacing any previous value.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a value by key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Get a value as UTF-8 text.
    async fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.get(key).await? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Put a UTF-8 text value.
    async fn put_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(key, value.as_bytes()).await
    }
}
