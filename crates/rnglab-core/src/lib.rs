//! RNG Lab Core — shared abstractions for the outcome engine.
//!
//! This crate defines the seams the engine depends on: time, randomness,
//! opaque blob storage, and a cancellable timer queue. It contains no
//! game rules.

pub mod clock;
pub mod error;
pub mod rng;
pub mod storage;
pub mod timer;
