//! Fixed-capacity ring buffer of rate updates

use super::RateRepository;
use crate::rate::RateUpdate;
use crate::telemetry::{set_gauge, GaugeMetric};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Upper bound on slots a configured cache may allocate
///
/// Slots are allocated up front, so this bounds the cache's memory footprint.
pub const MAX_CAPACITY: usize = 1_000_000;

/// Number of slots needed to retain `retention` worth of updates arriving
/// once per `interval`
///
/// This assumes a steady arrival rate; it is not an exact time-based window.
pub fn capacity_for(retention: Duration, interval: Duration) -> usize {
    if interval.is_zero() {
        return 0;
    }
    usize::try_from(retention.as_nanos() / interval.as_nanos()).unwrap_or(usize::MAX)
}

struct Ring {
    slots: Vec<Option<RateUpdate>>,
    head: usize,
    len: usize,
}

/// In-memory cache holding the most recent `capacity` updates
///
/// Inserts overwrite the oldest slot once the ring is full. Inserts are
/// expected to come from a single writer; reads may run concurrently.
pub struct RingCache {
    ring: RwLock<Ring>,
}

impl RingCache {
    /// Create a cache with a fixed number of slots
    ///
    /// All slots are allocated immediately; callers sizing the cache from
    /// configuration should stay within [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RwLock::new(Ring {
                slots: vec![None; capacity],
                head: 0,
                len: 0,
            }),
        }
    }

    /// Create a cache sized for a retention window at a given fetch interval
    pub fn for_retention(retention: Duration, interval: Duration) -> Self {
        Self::new(capacity_for(retention, interval))
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.ring.read().unwrap_or_else(PoisonError::into_inner).slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.ring.read().unwrap_or_else(PoisonError::into_inner).len
    }

    /// Whether no update has been retained yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateRepository for RingCache {
    fn insert(&self, update: RateUpdate) {
        let mut ring = self.ring.write().unwrap_or_else(PoisonError::into_inner);
        let capacity = ring.slots.len();
        if capacity == 0 {
            return;
        }

        let head = ring.head;
        if ring.slots[head].replace(update).is_none() {
            ring.len += 1;
        }
        ring.head = (head + 1) % capacity;

        set_gauge(GaugeMetric::CacheSize, ring.len as f64);
    }

    fn list_since(&self, since: DateTime<Utc>) -> Vec<RateUpdate> {
        let ring = self.ring.read().unwrap_or_else(PoisonError::into_inner);

        // The head slot is the oldest once the ring has wrapped
        let (newer, older) = ring.slots.split_at(ring.head);
        older
            .iter()
            .chain(newer.iter())
            .flatten()
            .filter(|update| update.at > since)
            .cloned()
            .collect()
    }
}
