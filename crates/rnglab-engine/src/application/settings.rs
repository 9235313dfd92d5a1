//! Session settings, read from the environment with sane defaults.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use rnglab_core::error::ConfigError;
use serde::{Deserialize, Serialize};

use crate::domain::ledger::{HISTORY_CAPACITY, MAX_HISTORY_CAPACITY};
use crate::domain::spin::LatencyWindow;

/// Autoplay intervals offered to players, in milliseconds.
pub const AUTOPLAY_PRESETS_MS: [u64; 3] = [1200, 2000, 4000];

/// Storage key for the history ledger blob.
pub const DEFAULT_HISTORY_KEY: &str = "rng_history_v1";

/// Storage key for the exported snapshot blob.
pub const DEFAULT_EXPORT_KEY: &str = "rng_history_export";

/// Tunables for a `GameSession`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Default autoplay tick interval.
    pub autoplay_interval_ms: u64,
    /// Shortest simulated spin latency.
    pub latency_min_ms: u32,
    /// Longest simulated spin latency (exclusive).
    pub latency_max_ms: u32,
    /// Ledger capacity.
    pub history_capacity: usize,
    /// Delay between a ledger mutation and the write it triggers.
    pub persist_debounce_ms: u64,
    /// Storage key for the ledger.
    pub history_key: String,
    /// Storage key for exported snapshots.
    pub export_key: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            autoplay_interval_ms: AUTOPLAY_PRESETS_MS[0],
            latency_min_ms: 900,
            latency_max_ms: 1800,
            history_capacity: HISTORY_CAPACITY,
            persist_debounce_ms: 250,
            history_key: DEFAULT_HISTORY_KEY.to_owned(),
            export_key: DEFAULT_EXPORT_KEY.to_owned(),
        }
    }
}

impl SessionSettings {
    /// Reads `RNGLAB_*` environment variables, defaulting any that are unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set but does not
    /// parse, or parses to a value that cannot work.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, with variables supplied by `lookup`.
    ///
    /// # Errors
    ///
    /// See `from_env`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let settings = Self {
            autoplay_interval_ms: parse_var(
                &lookup,
                "RNGLAB_AUTOPLAY_INTERVAL_MS",
                defaults.autoplay_interval_ms,
            )?,
            latency_min_ms: parse_var(&lookup, "RNGLAB_LATENCY_MIN_MS", defaults.latency_min_ms)?,
            latency_max_ms: parse_var(&lookup, "RNGLAB_LATENCY_MAX_MS", defaults.latency_max_ms)?,
            history_capacity: parse_var(
                &lookup,
                "RNGLAB_HISTORY_CAPACITY",
                defaults.history_capacity,
            )?,
            persist_debounce_ms: parse_var(
                &lookup,
                "RNGLAB_PERSIST_DEBOUNCE_MS",
                defaults.persist_debounce_ms,
            )?,
            history_key: lookup("RNGLAB_HISTORY_KEY").unwrap_or(defaults.history_key),
            export_key: lookup("RNGLAB_EXPORT_KEY").unwrap_or(defaults.export_key),
        };

        require_positive("RNGLAB_AUTOPLAY_INTERVAL_MS", settings.autoplay_interval_ms)?;
        require_capacity("RNGLAB_HISTORY_CAPACITY", settings.history_capacity)?;
        require_non_empty("RNGLAB_HISTORY_KEY", &settings.history_key)?;
        require_non_empty("RNGLAB_EXPORT_KEY", &settings.export_key)?;

        Ok(settings)
    }

    /// Latency window for the spin engine.
    #[must_use]
    pub fn latency_window(&self) -> LatencyWindow {
        LatencyWindow::new(self.latency_min_ms, self.latency_max_ms)
    }

    /// Default autoplay interval.
    #[must_use]
    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }

    /// Persistence debounce window.
    #[must_use]
    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: name.to_owned(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn require_positive(name: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            value: value.to_string(),
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(())
}

fn require_capacity(name: &str, value: usize) -> Result<(), ConfigError> {
    if !(1..=MAX_HISTORY_CAPACITY).contains(&value) {
        return Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            value: value.to_string(),
            reason: format!("must be between 1 and {MAX_HISTORY_CAPACITY}"),
        });
    }
    Ok(())
}

fn require_non_empty(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            name: name.to_owned(),
            value: value.to_owned(),
            reason: "must not be empty".to_owned(),
        });
    }
    Ok(())
}
