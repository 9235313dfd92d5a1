//! Pure game rules: no timers, no storage.

pub mod config;
pub mod events;
pub mod ledger;
pub mod seed;
pub mod spin;
pub mod stats;
