//! Clock backed by tokio's monotonic timer.

use chrono::{DateTime, Utc};
use rnglab_core::clock::Clock;
use tokio::time::Instant;

/// Wall-clock time derived from `tokio::time::Instant`.
///
/// Reads follow tokio's clock, so a runtime with paused time advances this
/// clock exactly as far as its sleeps. Timestamps never go backwards.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: DateTime<Utc>,
    started: Instant,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioClock {
    /// Anchors the clock at the current wall-clock time.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Anchors the clock at `origin`.
    #[must_use]
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            started: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.started.elapsed())
            .ok()
            .and_then(|elapsed| self.origin.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
