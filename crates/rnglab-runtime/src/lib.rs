//! RNG Lab runtime — drives a `GameSession` from a tokio task.
//!
//! The session never sleeps; it only knows its next deadline. The driver
//! sleeps until that deadline (or the next command) and polls.

pub mod clock;
pub mod driver;
pub mod error;

pub use clock::TokioClock;
pub use driver::{DriverHandle, SessionView, spawn};
pub use error::DriverError;
