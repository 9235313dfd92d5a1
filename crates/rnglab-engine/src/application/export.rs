//! Shareable snapshot of a session's history.

use serde::{Deserialize, Serialize};

use crate::domain::config::SpinConfiguration;
use crate::domain::ledger::HistoryLedger;
use crate::domain::spin::SpinResult;

/// Settings carried with an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// Outcome count configured at export time.
    pub num_outcomes: u32,
}

/// `{history, settings: {numOutcomes}}`, ready for a clipboard or file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    /// Ledger contents, newest first.
    pub history: Vec<SpinResult>,
    /// Current settings.
    pub settings: ExportSettings,
}

impl ExportSnapshot {
    /// Captures `ledger` under `config`.
    #[must_use]
    pub fn capture(ledger: &HistoryLedger, config: &SpinConfiguration) -> Self {
        Self {
            history: ledger.to_vec(),
            settings: ExportSettings {
                num_outcomes: config.num_outcomes(),
            },
        }
    }

    /// Serializes the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
