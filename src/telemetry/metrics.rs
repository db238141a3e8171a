//! Prometheus metrics

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Rate updates returned by the provider
    UpdatesFetched,
    /// Failed provider fetches
    FetchFailures,
    /// Updates dropped by the fetcher because the next tick arrived first
    FetcherDrops,
    /// Updates dropped for a subscriber whose queue was full
    FanoutDrops,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Live broadcaster subscriptions
    ActiveSubscriptions,
    /// Occupied replay cache slots
    CacheSize,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::UpdatesFetched => "raterelay_updates_fetched_total",
            CounterMetric::FetchFailures => "raterelay_fetch_failures_total",
            CounterMetric::FetcherDrops => "raterelay_fetcher_drops_total",
            CounterMetric::FanoutDrops => "raterelay_fanout_drops_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::ActiveSubscriptions => "raterelay_active_subscriptions",
            GaugeMetric::CacheSize => "raterelay_cache_size",
        }
    }
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    metrics::counter!(metric.name()).increment(value);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}
