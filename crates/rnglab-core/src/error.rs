//! Error types shared across the workspace.
//!
//! None of these are fatal to a session: storage failures degrade to an
//! in-memory ledger and configuration failures surface before a session
//! exists.

use thiserror::Error;

/// Failure reported by a `Storage` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backing store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The backing store refused the operation for a specific key.
    #[error("storage rejected key {key}: {reason}")]
    Rejected {
        /// The key the operation targeted.
        key: String,
        /// Why the store refused it.
        reason: String,
    },
}

/// A configuration value that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A named setting carried a value that failed to parse or validate.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        /// The setting (usually an environment variable) name.
        name: String,
        /// The raw value as supplied.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
