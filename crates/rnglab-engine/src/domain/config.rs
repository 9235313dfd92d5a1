//! Trial configuration and input clamping.
//!
//! Out-of-range input is never an error: every constructor clamps into
//! the playable range, including deserialization.

use serde::{Deserialize, Serialize};

/// Fewest outcomes a wheel may have.
pub const MIN_OUTCOMES: u32 = 2;
/// Most outcomes a wheel may have.
pub const MAX_OUTCOMES: u32 = 12;
/// Smallest accepted wager.
pub const MIN_BET: u64 = 1;
/// Smallest payout multiplier.
pub const MIN_MULTIPLIER: u32 = 1;
/// Largest payout multiplier.
pub const MAX_MULTIPLIER: u32 = 20;

/// Immutable snapshot of the knobs a trial is played with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSpinConfiguration")]
pub struct SpinConfiguration {
    num_outcomes: u32,
    bet_amount: u64,
    payout_multiplier: u32,
}

/// Unvalidated wire form, clamped on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpinConfiguration {
    num_outcomes: i64,
    bet_amount: i64,
    payout_multiplier: i64,
}

impl From<RawSpinConfiguration> for SpinConfiguration {
    fn from(raw: RawSpinConfiguration) -> Self {
        Self::clamped(raw.num_outcomes, raw.bet_amount, raw.payout_multiplier)
    }
}

impl Default for SpinConfiguration {
    fn default() -> Self {
        Self {
            num_outcomes: 6,
            bet_amount: 10,
            payout_multiplier: 5,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_u32(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn floor_bet(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0).max(MIN_BET)
}

impl SpinConfiguration {
    /// Builds a configuration, clamping each field into range.
    #[must_use]
    pub fn clamped(num_outcomes: i64, bet_amount: i64, payout_multiplier: i64) -> Self {
        Self {
            num_outcomes: clamp_u32(num_outcomes, MIN_OUTCOMES, MAX_OUTCOMES),
            bet_amount: floor_bet(bet_amount),
            payout_multiplier: clamp_u32(payout_multiplier, MIN_MULTIPLIER, MAX_MULTIPLIER),
        }
    }

    /// Copy with a new outcome count.
    #[must_use]
    pub fn with_num_outcomes(self, num_outcomes: i64) -> Self {
        Self {
            num_outcomes: clamp_u32(num_outcomes, MIN_OUTCOMES, MAX_OUTCOMES),
            ..self
        }
    }

    /// Copy with a new wager.
    #[must_use]
    pub fn with_bet_amount(self, bet_amount: i64) -> Self {
        Self {
            bet_amount: floor_bet(bet_amount),
            ..self
        }
    }

    /// Copy with a new payout multiplier.
    #[must_use]
    pub fn with_payout_multiplier(self, payout_multiplier: i64) -> Self {
        Self {
            payout_multiplier: clamp_u32(payout_multiplier, MIN_MULTIPLIER, MAX_MULTIPLIER),
            ..self
        }
    }

    /// Number of outcomes; also the lucky (winning) outcome.
    #[must_use]
    pub fn num_outcomes(&self) -> u32 {
        self.num_outcomes
    }

    /// Wager per trial.
    #[must_use]
    pub fn bet_amount(&self) -> u64 {
        self.bet_amount
    }

    /// Win payout is `bet_amount * payout_multiplier`.
    #[must_use]
    pub fn payout_multiplier(&self) -> u32 {
        self.payout_multiplier
    }

    /// Chance that a single trial wins.
    #[must_use]
    pub fn win_probability(&self) -> f64 {
        1.0 / f64::from(self.num_outcomes)
    }

    /// Expected net return per unit wagered. Zero is a fair game, negative
    /// favours the house.
    #[must_use]
    pub fn expected_return(&self) -> f64 {
        f64::from(self.payout_multiplier) / f64::from(self.num_outcomes) - 1.0
    }

    /// What a winning trial pays.
    #[must_use]
    pub fn winning_payout(&self) -> u64 {
        self.bet_amount
            .saturating_mul(u64::from(self.payout_multiplier))
    }
}
