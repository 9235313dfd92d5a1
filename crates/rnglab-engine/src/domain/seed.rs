//! Seeds and the random source derived from them.
//!
//! A non-empty seed string is folded into a 32-bit integer and drives a
//! Mulberry32 stream, so the same string always replays the same draws.
//! An empty seed falls back to an OS-seeded generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rnglab_core::rng::RandomSource;
use serde::{Deserialize, Serialize};

/// The user's seed string. Empty means unseeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedState {
    raw: String,
}

impl SeedState {
    /// Wraps a raw seed string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The empty seed.
    #[must_use]
    pub fn unseeded() -> Self {
        Self::default()
    }

    /// The seed exactly as the user typed it.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether draws will be replayable.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        !self.raw.is_empty()
    }

    /// The folded integer seed, or `None` when unseeded.
    #[must_use]
    pub fn derived(&self) -> Option<i32> {
        self.is_seeded().then(|| derive_seed(&self.raw))
    }
}

/// Folds `raw` into a signed 32-bit seed: `seed = seed * 31 + unit` over
/// its UTF-16 code units, wrapping on overflow.
#[must_use]
pub fn derive_seed(raw: &str) -> i32 {
    raw.encode_utf16()
        .fold(0_i32, |seed, unit| {
            seed.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
}

/// Mulberry32: one 32-bit word of state, an additive step and three
/// xor-shift/multiply rounds of output mixing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    const STEP: u32 = 0x6D2B_79F5;

    /// Starts a stream at `seed`. The bit pattern is used as-is.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn new(seed: i32) -> Self {
        Self { state: seed as u32 }
    }

    /// Advances the stream and returns the next mixed word.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(Self::STEP);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(1 | a);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        t ^ (t >> 14)
    }
}

impl RandomSource for Mulberry32 {
    fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

/// The session's single RNG cursor.
#[derive(Debug)]
pub enum SeededRandomSource {
    /// Replayable stream derived from a non-empty seed.
    Seeded(Mulberry32),
    /// Non-deterministic stream for an empty seed.
    Entropy(StdRng),
}

impl SeededRandomSource {
    /// Builds a fresh cursor for `seed`. Calling this again with the same
    /// seed restarts the sequence from the beginning.
    #[must_use]
    pub fn from_seed(seed: &SeedState) -> Self {
        match seed.derived() {
            Some(derived) => Self::Seeded(Mulberry32::new(derived)),
            None => Self::Entropy(StdRng::from_os_rng()),
        }
    }

    /// Whether the cursor replays for a given seed.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Seeded(_))
    }
}

impl RandomSource for SeededRandomSource {
    fn next_f64(&mut self) -> f64 {
        match self {
            Self::Seeded(stream) => stream.next_f64(),
            Self::Entropy(rng) => rng.random::<f64>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(source: &mut dyn RandomSource, n: usize) -> Vec<f64> {
        (0..n).map(|_| source.next_f64()).collect()
    }

    // --- derive_seed tests ---

    #[test]
    fn test_derive_seed_folds_char_codes() {
        // ((97 * 31) + 98) * 31 + 99
        assert_eq!(derive_seed("abc"), 96_354);
    }

    #[test]
    fn test_derive_seed_wraps_to_signed_32_bit() {
        assert_eq!(derive_seed("lucky outcome"), -1_591_421_414);
        assert_eq!(derive_seed("history ledger"), -388_586_891);
    }

    #[test]
    fn test_derive_seed_uses_utf16_code_units() {
        assert_eq!(derive_seed("héllo"), 103_094_734);
        // Astral-plane character folds as a surrogate pair.
        assert_eq!(derive_seed("🎲"), 1_773_302);
    }

    #[test]
    fn test_seed_state_empty_is_unseeded() {
        let seed = SeedState::unseeded();

        assert!(!seed.is_seeded());
        assert_eq!(seed.derived(), None);
    }

    #[test]
    fn test_seed_state_serializes_as_plain_string() {
        let json = serde_json::to_string(&SeedState::new("abc")).unwrap();

        assert_eq!(json, "\"abc\"");
    }

    // --- Mulberry32 tests ---

    #[test]
    fn test_mulberry32_known_sequence() {
        let mut stream = Mulberry32::new(derive_seed("abc"));

        assert_eq!(
            draws(&mut stream, 3),
            vec![
                0.356_556_629_063_561_56,
                0.061_450_610_635_802_15,
                0.007_002_958_562_225_103,
            ]
        );
    }

    #[test]
    fn test_mulberry32_output_stays_in_unit_interval() {
        let mut stream = Mulberry32::new(derive_seed("lucky outcome"));

        for value in draws(&mut stream, 10_000) {
            assert!((0.0..1.0).contains(&value), "{value} out of range");
        }
    }

    // --- SeededRandomSource tests ---

    #[test]
    fn test_same_seed_replays_identical_sequence() {
        let seed = SeedState::new("autoplay interval");
        let mut first = SeededRandomSource::from_seed(&seed);
        let mut second = SeededRandomSource::from_seed(&seed);

        assert!(first.is_deterministic());
        assert_eq!(draws(&mut first, 64), draws(&mut second, 64));
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut first = SeededRandomSource::from_seed(&SeedState::new("abc"));
        let mut second = SeededRandomSource::from_seed(&SeedState::new("abd"));

        assert_ne!(draws(&mut first, 8), draws(&mut second, 8));
    }

    #[test]
    fn test_unseeded_source_uses_entropy_in_range() {
        let mut source = SeededRandomSource::from_seed(&SeedState::unseeded());

        assert!(!source.is_deterministic());
        for value in draws(&mut source, 1_000) {
            assert!((0.0..1.0).contains(&value));
        }
    }
}
