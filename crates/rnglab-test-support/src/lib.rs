//! Shared test mocks and utilities for the RNG Lab outcome engine.

mod clock;
mod rng;
mod storage;

pub use clock::{FixedClock, ManualClock};
pub use rng::{MockRng, SequenceRng};
pub use storage::{FailingStorage, RecordingStorage, StorageOp};
