//! RNG Lab — deterministic outcome engine.
//!
//! Responsible for drawing seeded outcomes, walking each trial through
//! its request/latency/resolution lifecycle, re-triggering trials on an
//! autoplay timer, and keeping the bounded history ledger and its
//! statistics.

pub mod application;
pub mod domain;
