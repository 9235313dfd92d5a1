//! Moves the ledger and export snapshots in and out of `Storage`.
//!
//! Reads never fail: anything unreadable is treated as "no history".
//! Writes report `StorageError` so the session can retry later.

use std::sync::Arc;

use rnglab_core::error::StorageError;
use rnglab_core::storage::Storage;
use tracing::{debug, warn};

use super::export::ExportSnapshot;
use super::settings::SessionSettings;
use crate::domain::ledger::HistoryLedger;

/// Ledger-aware view over a `Storage` collaborator.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Arc<dyn Storage>,
    history_key: String,
    export_key: String,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("history_key", &self.history_key)
            .field("export_key", &self.export_key)
            .finish_non_exhaustive()
    }
}

impl HistoryStore {
    /// Wraps `storage` using the keys from `settings`.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, settings: &SessionSettings) -> Self {
        Self {
            storage,
            history_key: settings.history_key.clone(),
            export_key: settings.export_key.clone(),
        }
    }

    /// Loads the persisted ledger, or an empty one if nothing usable is
    /// stored.
    #[must_use]
    pub fn load(&self, capacity: usize) -> HistoryLedger {
        match self.storage.load(&self.history_key) {
            Ok(raw) => {
                let ledger = HistoryLedger::restore(raw.as_deref(), capacity);
                debug!(key = %self.history_key, entries = ledger.len(), "history loaded");
                ledger
            }
            Err(e) => {
                warn!(key = %self.history_key, error = %e, "history unavailable; starting empty");
                HistoryLedger::with_capacity(capacity)
            }
        }
    }

    /// Writes the ledger blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub fn save(&self, ledger: &HistoryLedger) -> Result<(), StorageError> {
        let blob = ledger.to_json().map_err(|e| StorageError::Rejected {
            key: self.history_key.clone(),
            reason: format!("history serialization failed: {e}"),
        })?;
        self.storage.save(&self.history_key, &blob)?;
        debug!(key = %self.history_key, entries = ledger.len(), "history saved");
        Ok(())
    }

    /// Drops the ledger blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the removal fails.
    pub fn remove(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.history_key)
    }

    /// Writes an export snapshot blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub fn save_export(&self, snapshot: &ExportSnapshot) -> Result<(), StorageError> {
        let blob = snapshot.to_json().map_err(|e| StorageError::Rejected {
            key: self.export_key.clone(),
            reason: format!("snapshot serialization failed: {e}"),
        })?;
        self.storage.save(&self.export_key, &blob)
    }
}
