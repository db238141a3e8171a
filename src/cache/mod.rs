//! Replay cache module
//!
//! Keeps a bounded window of recent rate updates so late-joining subscribers
//! can catch up on what they missed.

mod persister;
mod ring;

pub use persister::Persister;
pub use ring::{capacity_for, RingCache, MAX_CAPACITY};

use crate::rate::RateUpdate;
use chrono::{DateTime, Utc};

/// Storage for recently observed rate updates
pub trait RateRepository: Send + Sync {
    /// Store an update
    fn insert(&self, update: RateUpdate);
    /// All retained updates observed strictly after `since`, oldest first
    fn list_since(&self, since: DateTime<Utc>) -> Vec<RateUpdate>;
}
