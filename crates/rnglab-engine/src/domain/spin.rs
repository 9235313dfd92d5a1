//! The spin state machine.
//!
//! A trial is accepted only while no other trial is pending. On
//! acceptance the engine draws the simulated latency and then the roll
//! from the shared cursor, in that order; the outcome is fixed from that
//! moment and only revealed when the session resolves the ticket.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rnglab_core::rng::RandomSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::SpinConfiguration;
use super::seed::SeedState;

/// Identifies one accepted trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpinTicket(u64);

impl fmt::Display for SpinTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spin-{}", self.0)
    }
}

/// Engine phase as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinPhase {
    /// No trial has run yet.
    Idle,
    /// A trial is waiting out its latency.
    Pending,
    /// The last trial has resolved. Accepts new requests.
    Resolved,
}

/// Settings recorded alongside each result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSettings {
    /// Outcome count the trial was played with.
    pub num_outcomes: u32,
    /// Multiplier the trial was played with.
    pub payout_multiplier: u32,
    /// Seed in effect when the trial was requested.
    #[serde(default)]
    pub seed: SeedState,
}

/// One resolved trial. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinResult {
    /// When the trial resolved.
    #[serde(rename = "time", with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Outcome in `1..=num_outcomes`.
    pub roll: u32,
    /// `roll == num_outcomes`.
    pub win: bool,
    /// Amount wagered.
    #[serde(default)]
    pub bet: u64,
    /// `bet * payout_multiplier` on a win, else zero.
    #[serde(default)]
    pub payout: u64,
    /// Configuration snapshot taken at request time.
    #[serde(rename = "settings")]
    pub config_snapshot: TrialSettings,
}

impl SpinResult {
    /// Settles `roll` against `config`. The lucky outcome is always the
    /// highest one.
    #[must_use]
    pub fn settle(
        roll: u32,
        config: &SpinConfiguration,
        seed: SeedState,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let win = roll == config.num_outcomes();
        Self {
            timestamp,
            roll,
            win,
            bet: config.bet_amount(),
            payout: if win { config.winning_payout() } else { 0 },
            config_snapshot: TrialSettings {
                num_outcomes: config.num_outcomes(),
                payout_multiplier: config.payout_multiplier(),
                seed,
            },
        }
    }
}

/// Range the simulated latency is drawn from, in milliseconds:
/// `min_ms` inclusive, `max_ms` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyWindow {
    min_ms: u32,
    max_ms: u32,
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self {
            min_ms: 900,
            max_ms: 1800,
        }
    }
}

impl LatencyWindow {
    /// Builds a window. An empty or inverted range collapses to `min_ms`.
    #[must_use]
    pub fn new(min_ms: u32, max_ms: u32) -> Self {
        Self {
            min_ms,
            max_ms: max_ms.max(min_ms.saturating_add(1)),
        }
    }

    /// Lower bound, inclusive.
    #[must_use]
    pub fn min_ms(&self) -> u32 {
        self.min_ms
    }

    /// Upper bound, exclusive.
    #[must_use]
    pub fn max_ms(&self) -> u32 {
        self.max_ms
    }

    /// Consumes exactly one draw.
    fn draw(self, rng: &mut dyn RandomSource) -> Duration {
        Duration::from_millis(u64::from(rng.next_u32_range(self.min_ms, self.max_ms - 1)))
    }
}

/// Receipt for an accepted trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinRequest {
    /// Ticket to resolve the trial with.
    pub ticket: SpinTicket,
    /// Logical time of the request.
    pub requested_at: DateTime<Utc>,
    /// When the result may be revealed.
    pub resolves_at: DateTime<Utc>,
    /// `resolves_at - requested_at`.
    pub latency: Duration,
}

#[derive(Debug, Clone)]
struct PendingSpin {
    ticket: SpinTicket,
    roll: u32,
    config: SpinConfiguration,
    seed: SeedState,
}

#[derive(Debug, Clone)]
enum SpinState {
    Idle,
    Pending(PendingSpin),
    Resolved(SpinResult),
}

/// Owns at most one trial at a time.
#[derive(Debug)]
pub struct SpinEngine {
    state: SpinState,
    latency: LatencyWindow,
    next_ticket: u64,
}

impl Default for SpinEngine {
    fn default() -> Self {
        Self::new(LatencyWindow::default())
    }
}

impl SpinEngine {
    /// Creates an idle engine.
    #[must_use]
    pub fn new(latency: LatencyWindow) -> Self {
        Self {
            state: SpinState::Idle,
            latency,
            next_ticket: 1,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SpinPhase {
        match self.state {
            SpinState::Idle => SpinPhase::Idle,
            SpinState::Pending(_) => SpinPhase::Pending,
            SpinState::Resolved(_) => SpinPhase::Resolved,
        }
    }

    /// Whether a trial is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, SpinState::Pending(_))
    }

    /// Ticket of the in-flight trial.
    #[must_use]
    pub fn pending_ticket(&self) -> Option<SpinTicket> {
        match &self.state {
            SpinState::Pending(pending) => Some(pending.ticket),
            _ => None,
        }
    }

    /// Most recently resolved result, while no new trial is pending.
    #[must_use]
    pub fn last_result(&self) -> Option<&SpinResult> {
        match &self.state {
            SpinState::Resolved(result) => Some(result),
            _ => None,
        }
    }

    /// The latency window in use.
    #[must_use]
    pub fn latency(&self) -> LatencyWindow {
        self.latency
    }

    /// Accepts a trial unless one is already pending.
    ///
    /// Draws latency first and roll second. Returns `None` without
    /// touching `rng` when rejected.
    pub fn request_spin(
        &mut self,
        config: SpinConfiguration,
        seed: &SeedState,
        rng: &mut dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Option<SpinRequest> {
        if let SpinState::Pending(pending) = &self.state {
            debug!(ticket = %pending.ticket, "spin rejected: trial already pending");
            return None;
        }

        let latency = self.latency.draw(rng);
        let roll = rng.next_u32_range(1, config.num_outcomes());

        let ticket = SpinTicket(self.next_ticket);
        self.next_ticket += 1;

        let resolves_at = now
            + chrono::Duration::from_std(latency).unwrap_or_else(|_| chrono::Duration::zero());
        debug!(%ticket, latency_ms = latency.as_millis(), "spin accepted");

        self.state = SpinState::Pending(PendingSpin {
            ticket,
            roll,
            config,
            seed: seed.clone(),
        });

        Some(SpinRequest {
            ticket,
            requested_at: now,
            resolves_at,
            latency,
        })
    }

    /// Reveals the pending trial if `ticket` names it.
    ///
    /// Returns `None` for a stale or unknown ticket, leaving state alone.
    pub fn resolve(&mut self, ticket: SpinTicket, at: DateTime<Utc>) -> Option<SpinResult> {
        let pending = match std::mem::replace(&mut self.state, SpinState::Idle) {
            SpinState::Pending(pending) if pending.ticket == ticket => pending,
            other => {
                self.state = other;
                debug!(%ticket, "ignoring stale resolution");
                return None;
            }
        };

        let result = SpinResult::settle(pending.roll, &pending.config, pending.seed, at);
        debug!(%ticket, roll = result.roll, win = result.win, "spin resolved");
        self.state = SpinState::Resolved(result.clone());
        Some(result)
    }

    /// Discards an in-flight trial without resolving it. Only used when the
    /// owning session is destroyed.
    pub fn abandon(&mut self) -> Option<SpinTicket> {
        let ticket = self.pending_ticket()?;
        self.state = SpinState::Idle;
        Some(ticket)
    }
}
