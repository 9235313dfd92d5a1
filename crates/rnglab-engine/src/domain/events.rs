//! Notifications emitted by a session to its observers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::spin::{SpinResult, SpinTicket};

/// Something observable happened in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A trial was accepted and will resolve at `resolves_at`.
    SpinRequested {
        /// The accepted trial.
        ticket: SpinTicket,
        /// When the result will be revealed.
        resolves_at: DateTime<Utc>,
        /// Whether autoplay issued the request.
        autoplay: bool,
    },
    /// A manual request arrived while a trial was pending.
    SpinRejected,
    /// A trial resolved and was recorded.
    SpinResolved(SpinResult),
    /// Autoplay (re)started.
    AutoplayStarted {
        /// Tick interval in milliseconds.
        interval_ms: u64,
    },
    /// Autoplay stopped.
    AutoplayStopped,
    /// An autoplay tick landed while a trial was pending and was dropped.
    AutoplayTickDropped,
    /// The ledger was emptied.
    HistoryCleared {
        /// Number of entries removed.
        dropped: usize,
    },
}

impl SessionEvent {
    /// Stable dotted name, for logging and routing.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SpinRequested { .. } => "spin.requested",
            Self::SpinRejected => "spin.rejected",
            Self::SpinResolved(_) => "spin.resolved",
            Self::AutoplayStarted { .. } => "autoplay.started",
            Self::AutoplayStopped => "autoplay.stopped",
            Self::AutoplayTickDropped => "autoplay.tick_dropped",
            Self::HistoryCleared { .. } => "history.cleared",
        }
    }
}

/// Receives session events synchronously, in emission order.
pub trait SessionObserver: Send {
    /// Called once per event.
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionObserver for F
where
    F: FnMut(&SessionEvent) + Send,
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event);
    }
}
