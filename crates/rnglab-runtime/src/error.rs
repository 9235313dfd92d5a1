//! Driver error types.

use rnglab_core::error::StorageError;

/// Errors returned through a `DriverHandle`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The driver task has stopped; the command was not applied.
    #[error("session driver closed")]
    Closed,

    /// The session applied the command but storage refused the write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
