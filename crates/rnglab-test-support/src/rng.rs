//! Test RNG — scripted `RandomSource` implementations for tests.

use rnglab_core::rng::RandomSource;

/// A no-op RNG that always returns `0.0`. Every latency lands on the window
/// minimum and every roll is `1`, which never wins.
#[derive(Debug)]
pub struct MockRng;

impl RandomSource for MockRng {
    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// An RNG that returns floats from a predetermined sequence. Panics if the
/// sequence is exhausted. A trial consumes two values: latency, then roll.
#[derive(Debug, Clone)]
pub struct SequenceRng {
    values: Vec<f64>,
    index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` with the given values.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, index: 0 }
    }

    /// Script `trials` as `(latency_fraction, roll_fraction)` pairs.
    #[must_use]
    pub fn trials(trials: &[(f64, f64)]) -> Self {
        Self::new(
            trials
                .iter()
                .flat_map(|&(latency, roll)| [latency, roll])
                .collect(),
        )
    }

    /// Number of values handed out so far.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.index
    }
}

impl RandomSource for SequenceRng {
    fn next_f64(&mut self) -> f64 {
        let val = self.values[self.index];
        self.index += 1;
        val
    }
}
