//! Summary statistics derived from the ledger on demand.

use serde::Serialize;

use super::spin::SpinResult;

/// Totals over a set of resolved trials. Never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of trials.
    pub total: usize,
    /// Number of winning trials.
    pub wins: usize,
    /// Sum of wagers.
    pub spent: u64,
    /// Sum of payouts.
    pub earned: u64,
    /// `(earned - spent) / spent`; `None` while nothing has been spent.
    pub roi: Option<f64>,
    /// `wins / total`; `None` while there are no trials.
    pub win_rate: Option<f64>,
}

impl Stats {
    /// Net result, `earned - spent`.
    #[must_use]
    pub fn net(&self) -> i128 {
        i128::from(self.earned) - i128::from(self.spent)
    }
}

/// Aggregates `results` into `Stats`. Pure; safe on an empty input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute<'a>(results: impl IntoIterator<Item = &'a SpinResult>) -> Stats {
    let mut stats = results
        .into_iter()
        .fold(Stats::default(), |mut acc, result| {
            acc.total += 1;
            acc.wins += usize::from(result.win);
            acc.spent = acc.spent.saturating_add(result.bet);
            acc.earned = acc.earned.saturating_add(result.payout);
            acc
        });

    if stats.spent > 0 {
        stats.roi = Some(stats.net() as f64 / stats.spent as f64);
    }
    if stats.total > 0 {
        stats.win_rate = Some(stats.wins as f64 / stats.total as f64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::domain::config::SpinConfiguration;
    use crate::domain::ledger::HistoryLedger;
    use crate::domain::seed::SeedState;

    fn result(roll: u32, bet: i64, multiplier: i64) -> SpinResult {
        SpinResult::settle(
            roll,
            &SpinConfiguration::clamped(6, bet, multiplier),
            SeedState::unseeded(),
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_empty_ledger_has_roi_sentinel() {
        let stats = compute(HistoryLedger::default().iter());

        assert_eq!(stats.total, 0);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.spent, 0);
        assert_eq!(stats.earned, 0);
        assert_eq!(stats.roi, None);
        assert_eq!(stats.win_rate, None);
    }

    #[test]
    fn test_compute_totals_and_ratios() {
        let results = [result(6, 10, 5), result(1, 10, 5), result(3, 10, 5), result(2, 10, 5)];

        let stats = compute(&results);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.spent, 40);
        assert_eq!(stats.earned, 50);
        assert_eq!(stats.net(), 10);
        assert!((stats.roi.unwrap() - 0.25).abs() < f64::EPSILON);
        assert!((stats.win_rate.unwrap() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_all_losses_yield_minus_one_roi() {
        let stats = compute(&[result(1, 7, 5), result(2, 3, 5)]);

        assert_eq!(stats.net(), -10);
        assert!((stats.roi.unwrap() + 1.0).abs() < f64::EPSILON);
        assert_eq!(stats.win_rate, Some(0.0));
    }

    #[test]
    fn test_zero_bet_entries_keep_roi_sentinel() {
        // Legacy entries with no recorded wager deserialize with bet 0.
        let mut legacy = result(1, 1, 1);
        legacy.bet = 0;

        let stats = compute(&[legacy]);

        assert_eq!(stats.total, 1);
        assert_eq!(stats.roi, None);
    }

    #[test]
    fn test_serializes_sentinel_as_null() {
        let json = serde_json::to_value(compute(std::iter::empty())).unwrap();

        assert_eq!(json["roi"], serde_json::Value::Null);
        assert_eq!(json["winRate"], serde_json::Value::Null);
    }
}
