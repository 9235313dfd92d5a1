//! Test storage — mock `Storage` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use rnglab_core::error::StorageError;
use rnglab_core::storage::Storage;

/// One call observed by a `RecordingStorage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// `save(key, value)`
    Save(String, String),
    /// `remove(key)`
    Remove(String),
}

/// A storage that keeps blobs in memory and records every mutating call,
/// so tests can assert how often and what the session persisted.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    blobs: Mutex<HashMap<String, String>>,
    ops: Mutex<Vec<StorageOp>>,
}

impl RecordingStorage {
    /// Create an empty recording storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recording storage pre-seeded with `value` under `key`.
    /// Seeding is not recorded as an operation.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_blob(key: &str, value: &str) -> Self {
        let storage = Self::default();
        storage
            .blobs
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        storage
    }

    /// Current blob under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn blob(&self, key: &str) -> Option<String> {
        self.blobs.lock().unwrap().get(key).cloned()
    }

    /// Snapshot of every recorded operation, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn ops(&self) -> Vec<StorageOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Number of `save` calls made against `key`.
    pub fn save_count(&self, key: &str) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, StorageOp::Save(k, _) if k == key))
            .count()
    }
}

impl Storage for RecordingStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.blob(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_owned(), value.to_owned());
        self.ops
            .lock()
            .unwrap()
            .push(StorageOp::Save(key.to_owned(), value.to_owned()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().remove(key);
        self.ops
            .lock()
            .unwrap()
            .push(StorageOp::Remove(key.to_owned()));
        Ok(())
    }
}

/// A storage that always returns an unavailable error. Useful for testing
/// that persistence failures degrade instead of propagating.
#[derive(Debug)]
pub struct FailingStorage;

impl Storage for FailingStorage {
    fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("quota exceeded".into()))
    }

    fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("quota exceeded".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("quota exceeded".into()))
    }
}
