//! Periodic trial trigger.
//!
//! Each `start` opens a new generation identified by an `AutoplayToken`.
//! Ticks carry the token they were scheduled under; a tick from an older
//! generation is stale and ignored. Restarting always cancels the old
//! timer before scheduling the new one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rnglab_core::timer::{TimerQueue, TimerToken};
use tracing::debug;

use super::session::SessionTimer;

/// Shortest interval honoured; anything lower is raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Identifies one autoplay generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AutoplayToken(u64);

/// What to do with a tick that just fell due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Request a trial now.
    Fire,
    /// The engine is busy; skip this tick.
    Dropped,
    /// The tick belongs to a stopped or replaced generation.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct ActiveRun {
    token: AutoplayToken,
    interval: Duration,
    timer: TimerToken,
}

/// Schedules autoplay ticks into the session's timer queue.
#[derive(Debug, Default)]
pub struct AutoplayScheduler {
    generation: u64,
    active: Option<ActiveRun>,
}

/// `at + interval`, saturating at the latest representable instant.
pub(crate) fn after(at: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl AutoplayScheduler {
    /// Creates a stopped scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether autoplay is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Token of the running generation.
    #[must_use]
    pub fn token(&self) -> Option<AutoplayToken> {
        self.active.map(|run| run.token)
    }

    /// Interval of the running generation.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.active.map(|run| run.interval)
    }

    /// Starts a new generation with its first tick one `interval` after
    /// `now`, cancelling any running generation first.
    pub(crate) fn start(
        &mut self,
        timers: &mut TimerQueue<SessionTimer>,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> AutoplayToken {
        self.stop(timers);

        let interval = interval.max(MIN_INTERVAL);
        self.generation += 1;
        let token = AutoplayToken(self.generation);
        let timer = timers.schedule(after(now, interval), SessionTimer::AutoplayTick(token));
        self.active = Some(ActiveRun {
            token,
            interval,
            timer,
        });
        debug!(
            generation = self.generation,
            interval_ms = interval.as_millis(),
            "autoplay started"
        );
        token
    }

    /// Restarts the running generation against the current configuration.
    /// Does nothing when stopped.
    pub(crate) fn restart(
        &mut self,
        timers: &mut TimerQueue<SessionTimer>,
        now: DateTime<Utc>,
    ) -> Option<AutoplayToken> {
        let interval = self.interval()?;
        Some(self.start(timers, interval, now))
    }

    /// Cancels the pending tick. Returns whether autoplay was running.
    pub(crate) fn stop(&mut self, timers: &mut TimerQueue<SessionTimer>) -> bool {
        let Some(run) = self.active.take() else {
            return false;
        };
        timers.cancel(run.timer);
        debug!(generation = run.token.0, "autoplay stopped");
        true
    }

    /// Handles a tick scheduled for `deadline`. Schedules the next tick of a
    /// live generation on a fixed cadence, whether or not this one fires.
    pub(crate) fn on_tick(
        &mut self,
        timers: &mut TimerQueue<SessionTimer>,
        token: AutoplayToken,
        deadline: DateTime<Utc>,
        engine_busy: bool,
    ) -> TickOutcome {
        let Some(run) = self.active.as_mut().filter(|run| run.token == token) else {
            return TickOutcome::Stale;
        };

        run.timer = timers.schedule(
            after(deadline, run.interval),
            SessionTimer::AutoplayTick(token),
        );

        if engine_busy {
            debug!(generation = token.0, "autoplay tick dropped: trial pending");
            TickOutcome::Dropped
        } else {
            TickOutcome::Fire
        }
    }
}
