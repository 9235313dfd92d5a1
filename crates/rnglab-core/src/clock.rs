//! Clock abstraction for determinism.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstraction over wall-clock time.
///
/// Timer deadlines and result timestamps are both read from the same clock,
/// so a test clock fully controls when scheduled callbacks fall due.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Time remaining until `deadline`, or zero if it has already passed.
    fn until(&self, deadline: DateTime<Utc>) -> Duration {
        (deadline - self.now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
