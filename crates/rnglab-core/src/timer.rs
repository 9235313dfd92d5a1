//! Cancellable scheduled callbacks.
//!
//! A `TimerQueue` holds payloads keyed by deadline. Scheduling hands back a
//! `TimerToken` owned by the caller; cancelling with that token is a
//! distinct step that always completes before any rescheduling. Nothing
//! here sleeps: the owner polls `pop_due` with the current time.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

/// Handle to a single scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Raw token value, for logging.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A callback whose deadline has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Due<T> {
    /// Token the callback was scheduled under.
    pub token: TimerToken,
    /// The deadline it was scheduled for (not the time it was popped).
    pub deadline: DateTime<Utc>,
    /// Caller-defined payload.
    pub payload: T,
}

/// Deadline-ordered queue of pending callbacks.
///
/// Callbacks sharing a deadline fire in the order they were scheduled.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    pending: BTreeMap<(DateTime<Utc>, u64), T>,
    deadlines: HashMap<u64, DateTime<Utc>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `payload` to fall due at `deadline`.
    pub fn schedule(&mut self, deadline: DateTime<Utc>, payload: T) -> TimerToken {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        TimerToken(id)
    }

    /// Cancels a scheduled callback, returning its payload.
    ///
    /// Returns `None` if the token already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> Option<T> {
        let deadline = self.deadlines.remove(&token.0)?;
        self.pending.remove(&(deadline, token.0))
    }

    /// Whether `token` is still waiting to fire.
    #[must_use]
    pub fn is_scheduled(&self, token: TimerToken) -> bool {
        self.deadlines.contains_key(&token.0)
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest callback due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<Due<T>> {
        let (&(deadline, id), _) = self.pending.first_key_value()?;
        if deadline > now {
            return None;
        }
        let payload = self.pending.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        Some(Due {
            token: TimerToken(id),
            deadline,
            payload,
        })
    }

    /// Cancels everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadlines.clear();
    }

    /// Number of pending callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
