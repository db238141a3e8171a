//! Periodic fetching module
//!
//! Polls a rate provider on a fixed cadence and pushes the resulting updates
//! onto the shared inbound channel of the broadcaster.

mod periodic;

pub use periodic::PeriodicFetcher;
