//! Subscription registry and fan-out loop

use super::{BroadcastError, RateSubscriber};
use crate::rate::RateUpdate;
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Live subscription queues keyed by identifier
#[derive(Default)]
struct Registry {
    queues: HashMap<String, mpsc::Sender<RateUpdate>>,
    closed: bool,
}

/// Fans one update stream out to many subscription queues
///
/// The registry holds the only sender of every subscription queue, so
/// removing an entry closes that queue. Fan-out holds the registry lock for
/// the whole pass, which keeps delivery and removal mutually exclusive.
pub struct Broadcaster {
    queue_capacity: usize,
    registry: Mutex<Registry>,
}

impl Broadcaster {
    /// Create a broadcaster whose subscription queues hold `queue_capacity`
    /// updates
    ///
    /// # Panics
    ///
    /// Panics if `queue_capacity` is zero.
    pub fn new(queue_capacity: usize) -> Self {
        assert!(queue_capacity > 0, "subscription queue capacity must be non-zero");
        Self {
            queue_capacity,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.registry().queues.len()
    }

    /// Consume `updates` until the channel is closed, offering each update
    /// to every registered subscription without blocking
    pub async fn run(&self, mut updates: mpsc::Receiver<RateUpdate>) {
        tracing::info!("Broadcaster started");

        while let Some(update) = updates.recv().await {
            self.fan_out(&update);
        }

        tracing::info!("Inbound update channel closed, broadcaster stopping");
    }

    /// Remove and close every remaining subscription
    ///
    /// Later calls to `subscribe` fail with [`BroadcastError::Closed`].
    pub fn close(&self) {
        let mut registry = self.registry();
        registry.closed = true;
        let count = registry.queues.len();
        registry.queues.clear();
        set_gauge(GaugeMetric::ActiveSubscriptions, 0.0);

        if count > 0 {
            tracing::info!(count, "Closed remaining subscriptions");
        }
    }

    fn fan_out(&self, update: &RateUpdate) {
        let registry = self.registry();

        for (id, queue) in registry.queues.iter() {
            match queue.try_send(update.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    increment_counter(CounterMetric::FanoutDrops, 1);
                    tracing::debug!(
                        subscription = %id,
                        to = %update.to,
                        at = %update.at,
                        "Subscription queue full, dropping update"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    // Receiver dropped without unsubscribing; removed on unsubscribe
                    tracing::debug!(subscription = %id, "Subscription receiver gone");
                }
            }
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RateSubscriber for Broadcaster {
    fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<RateUpdate>, BroadcastError> {
        let mut registry = self.registry();
        if registry.closed {
            return Err(BroadcastError::Closed);
        }

        match registry.queues.entry(id.to_string()) {
            Entry::Occupied(_) => Err(BroadcastError::DuplicateSubscription(id.to_string())),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(self.queue_capacity);
                slot.insert(tx);
                set_gauge(GaugeMetric::ActiveSubscriptions, registry.queues.len() as f64);
                tracing::debug!(subscription = %id, "Subscription registered");
                Ok(rx)
            }
        }
    }

    fn unsubscribe(&self, id: &str) {
        let mut registry = self.registry();

        if registry.queues.remove(id).is_some() {
            set_gauge(GaugeMetric::ActiveSubscriptions, registry.queues.len() as f64);
            tracing::debug!(subscription = %id, "Subscription removed");
        }
    }
}
