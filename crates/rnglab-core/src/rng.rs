//! Random number generator abstraction for determinism.
//!
//! In production this is backed by a seeded Mulberry32 stream or by OS
//! entropy. In tests a scripted implementation is injected.

/// Abstraction over a stream of uniform floats.
pub trait RandomSource: Send {
    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Generate a random `u32` in the range `[min, max]` inclusive.
    ///
    /// Consumes exactly one `next_f64` draw, scaled by flooring, so the
    /// mapping from float stream to integers is stable across sources.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let span = u64::from(max.saturating_sub(min)) + 1;
        let offset = (self.next_f64() * span as f64).floor() as u64;
        // Guards against a source that returns exactly 1.0.
        min + offset.min(span - 1) as u32
    }
}
