//! Opaque blob storage abstraction.
//!
//! The engine never interprets storage mechanics. It hands serialized JSON
//! to a `Storage` under a well-known key and reads it back the same way.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StorageError;

/// Key/value store for serialized session state.
pub trait Storage: Send + Sync {
    /// Load the blob stored under `key`, or `None` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store rejects the write.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Drop whatever is stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage for sessions that do not outlive the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn blobs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.blobs
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("storage mutex poisoned: {e}")))
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blobs()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.blobs()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.blobs()?.remove(key);
        Ok(())
    }
}
