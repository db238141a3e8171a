//! Exchange rate update records
//!
//! The value type that flows from the provider through the broadcaster to
//! every subscriber and into the replay cache.

mod types;

pub use types::RateUpdate;

/// Currency code all provider rates are quoted against
pub const BASE_CURRENCY: &str = "BTC";
