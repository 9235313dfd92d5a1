//! Session orchestration: timers, persistence, export, settings.

pub mod autoplay;
pub mod export;
pub mod persistence;
pub mod session;
pub mod settings;
