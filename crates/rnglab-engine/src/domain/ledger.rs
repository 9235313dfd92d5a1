//! Bounded, newest-first record of resolved trials.

use std::collections::VecDeque;

use tracing::warn;

use super::spin::SpinResult;

/// Entries kept before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 200;

/// Largest capacity a ledger accepts; larger requests are lowered to this.
pub const MAX_HISTORY_CAPACITY: usize = 10_000;

/// Resolved trials, newest first, capped at a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLedger {
    entries: VecDeque<SpinResult>,
    capacity: usize,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl HistoryLedger {
    /// Creates an empty ledger holding at most `capacity` entries, clamped
    /// to `1..=MAX_HISTORY_CAPACITY`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity,
        }
    }

    /// Rebuilds a ledger from a stored blob.
    ///
    /// A missing blob, or one that does not parse as a list of results,
    /// yields an empty ledger. Oversized blobs keep their newest entries.
    #[must_use]
    pub fn restore(raw: Option<&str>, capacity: usize) -> Self {
        let mut ledger = Self::with_capacity(capacity);
        let Some(raw) = raw else {
            return ledger;
        };

        match serde_json::from_str::<Vec<SpinResult>>(raw) {
            Ok(entries) => {
                ledger.entries.extend(entries);
                ledger.entries.truncate(ledger.capacity);
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable history blob");
            }
        }
        ledger
    }

    /// Prepends `result`, evicting the oldest entry past capacity.
    pub fn record(&mut self, result: SpinResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.capacity);
    }

    /// Drops every entry, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &SpinResult> {
        self.entries.iter()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&SpinResult> {
        self.entries.front()
    }

    /// Owned copy of the entries, newest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<SpinResult> {
        self.entries.iter().cloned().collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Serializes the entries as a JSON array, newest first.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries)
    }
}
