//! Interval-driven provider polling with a stop handshake

use crate::provider::{ProviderError, RateProvider, RateSnapshot};
use crate::rate::{RateUpdate, BASE_CURRENCY};
use crate::telemetry::{increment_counter, CounterMetric};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Fetches rates once per interval and emits one update per target currency
///
/// Each update is raced against the next tick: when the tick wins, the rest
/// of the batch is stale and is dropped in favour of a fresh fetch. A fetcher
/// runs at most once; after [`close`](Self::close) it cannot be restarted.
pub struct PeriodicFetcher {
    provider: Arc<dyn RateProvider>,
    currencies: Vec<String>,
    interval: Duration,
    stop: CancellationToken,
    /// Held by `run` for its whole lifetime
    running: Mutex<()>,
}

impl PeriodicFetcher {
    /// Create a new fetcher
    ///
    /// # Panics
    ///
    /// `run` panics if `interval` is zero.
    pub fn new(provider: Arc<dyn RateProvider>, currencies: Vec<String>, interval: Duration) -> Self {
        Self {
            provider,
            currencies,
            interval,
            stop: CancellationToken::new(),
            running: Mutex::new(()),
        }
    }

    /// Fetch once and convert the snapshot into updates for the target
    /// currencies
    pub async fn fetch(&self) -> Result<Vec<RateUpdate>, ProviderError> {
        let snapshot = self.provider.fetch_snapshot().await?;
        Ok(self.to_updates(snapshot))
    }

    /// Poll until [`close`](Self::close) is called
    ///
    /// Fetch failures are logged and the tick is skipped. Returns early only
    /// if `outbound` has no receiver left.
    pub async fn run(&self, outbound: mpsc::Sender<RateUpdate>) {
        let _running = self.running.lock().await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick_due = false;

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            currencies = ?self.currencies,
            "Periodic fetcher started"
        );

        'polling: loop {
            if !tick_due {
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => break 'polling,
                    _ = ticker.tick() => {}
                }
            }
            tick_due = false;

            let result = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break 'polling,
                result = self.fetch() => result,
            };

            let updates = match result {
                Ok(updates) => updates,
                Err(e) => {
                    increment_counter(CounterMetric::FetchFailures, 1);
                    tracing::warn!(error = %e, "Rate fetch failed, skipping tick");
                    continue;
                }
            };
            increment_counter(CounterMetric::UpdatesFetched, updates.len() as u64);

            let total = updates.len();
            for (sent, update) in updates.into_iter().enumerate() {
                tokio::select! {
                    biased;
                    _ = self.stop.cancelled() => break 'polling,
                    result = outbound.send(update) => {
                        if result.is_err() {
                            tracing::error!("Outbound channel closed, fetcher stopping");
                            return;
                        }
                    }
                    _ = ticker.tick() => {
                        let dropped = (total - sent) as u64;
                        increment_counter(CounterMetric::FetcherDrops, dropped);
                        tracing::debug!(dropped, "Next tick arrived before delivery, dropping stale updates");
                        tick_due = true;
                        break;
                    }
                }
            }
        }

        tracing::info!("Periodic fetcher stopped");
    }

    /// Signal `run` to stop and wait until it has returned
    ///
    /// Returns immediately if `run` was never started or has already
    /// returned. Safe to call more than once.
    ///
    /// A `run` future that has been spawned but not yet polled does not hold
    /// the running lock, so `close` does not wait for it. Such a `run` sees
    /// the cancelled token on its first poll and returns without fetching.
    pub async fn close(&self) {
        self.stop.cancel();
        drop(self.running.lock().await);
    }

    fn to_updates(&self, snapshot: RateSnapshot) -> Vec<RateUpdate> {
        self.currencies
            .iter()
            .filter_map(|code| match snapshot.rates.get(code) {
                Some(rate) => Some(RateUpdate::new(
                    BASE_CURRENCY,
                    code.as_str(),
                    snapshot.observed_at,
                    rate.as_str(),
                )),
                None => {
                    tracing::warn!(currency = %code, "Rate not found in provider snapshot");
                    None
                }
            })
            .collect()
    }
}
