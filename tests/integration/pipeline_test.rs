//! End-to-end tests for the assembled pipeline

use crate::common::{
    connect, eventually, expect_closed, fake_coindesk, local_listener, next_update,
    COINDESK_PAYLOAD,
};
use async_trait::async_trait;
use axum::http::StatusCode;
use rate_relay::broadcast::Broadcaster;
use rate_relay::cache::RingCache;
use rate_relay::fetcher::PeriodicFetcher;
use rate_relay::pipeline::Pipeline;
use rate_relay::provider::{
    CoinDeskClient, CoinDeskConfig, ProviderError, RateProvider, RateSnapshot,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_millis(100);

struct Running {
    addr: SocketAddr,
    broadcaster: Arc<Broadcaster>,
    cache: Arc<RingCache>,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

async fn start_pipeline(provider: Arc<dyn RateProvider>, currencies: &[&str]) -> Running {
    let currencies = currencies.iter().map(|c| c.to_string()).collect();
    let fetcher = Arc::new(PeriodicFetcher::new(provider, currencies, INTERVAL));
    let broadcaster = Arc::new(Broadcaster::new(8));
    let cache = Arc::new(RingCache::new(16));
    let (listener, addr) = local_listener().await;

    let pipeline = Pipeline::new(fetcher, broadcaster.clone(), cache.clone(), listener);
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(pipeline.run(shutdown.clone()));

    Running {
        addr,
        broadcaster,
        cache,
        shutdown,
        handle,
    }
}

async fn coindesk_provider() -> Arc<dyn RateProvider> {
    let upstream = fake_coindesk(StatusCode::OK, COINDESK_PAYLOAD).await;
    Arc::new(
        CoinDeskClient::with_config(CoinDeskConfig {
            base_url: format!("http://{}", upstream),
            timeout: Duration::from_secs(2),
        })
        .unwrap(),
    )
}

#[tokio::test]
async fn test_streams_fetched_rates_to_clients() {
    let running = start_pipeline(coindesk_provider().await, &["USD"]).await;

    let mut client = connect(running.addr, "").await;
    let update = next_update(&mut client).await;

    assert_eq!(update.from, "BTC");
    assert_eq!(update.to, "USD");
    assert_eq!(update.rate, "42,500.5012");
    assert_eq!(update.at.to_rfc3339(), "2024-01-15T10:00:00+00:00");

    running.shutdown.cancel();
    assert!(running.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_publishes_each_configured_currency() {
    let running = start_pipeline(coindesk_provider().await, &["USD", "EUR", "JPY"]).await;

    let mut client = connect(running.addr, "").await;
    let mut seen = Vec::new();
    while seen.len() < 2 {
        let update = next_update(&mut client).await;
        if !seen.contains(&update.to) {
            seen.push(update.to);
        }
    }
    seen.sort();
    assert_eq!(seen, vec!["EUR", "USD"]);

    running.shutdown.cancel();
    assert!(running.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_late_client_gets_replay() {
    let running = start_pipeline(coindesk_provider().await, &["USD"]).await;

    let cache = running.cache.clone();
    eventually(|| !cache.is_empty()).await;

    let mut client = connect(running.addr, "?since=0").await;
    let replayed = next_update(&mut client).await;
    assert_eq!(replayed.rate, "42,500.5012");

    running.shutdown.cancel();
    assert!(running.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let running = start_pipeline(coindesk_provider().await, &["USD"]).await;

    let mut client = connect(running.addr, "").await;
    let broadcaster = running.broadcaster.clone();
    // cache subscription plus the client
    eventually(|| broadcaster.subscription_count() == 2).await;

    running.shutdown.cancel();
    let result = timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("pipeline did not stop")
        .unwrap();
    assert!(result.is_ok());

    expect_closed(&mut client).await;
    assert_eq!(running.broadcaster.subscription_count(), 0);
}

#[tokio::test]
async fn test_upstream_errors_do_not_stop_pipeline() {
    let upstream = fake_coindesk(StatusCode::SERVICE_UNAVAILABLE, "down").await;
    let provider = Arc::new(
        CoinDeskClient::with_config(CoinDeskConfig {
            base_url: format!("http://{}", upstream),
            timeout: Duration::from_secs(2),
        })
        .unwrap(),
    );
    let running = start_pipeline(provider, &["USD"]).await;

    tokio::time::sleep(INTERVAL * 3).await;
    assert!(!running.handle.is_finished());
    assert!(running.cache.is_empty());

    running.shutdown.cancel();
    assert!(running.handle.await.unwrap().is_ok());
}

/// Provider that panics on the first fetch
struct PanickingProvider;

#[async_trait]
impl RateProvider for PanickingProvider {
    async fn fetch_snapshot(&self) -> Result<RateSnapshot, ProviderError> {
        panic!("provider exploded");
    }
}

#[tokio::test]
async fn test_component_failure_stops_pipeline() {
    let running = start_pipeline(Arc::new(PanickingProvider), &["USD"]).await;

    let result = timeout(Duration::from_secs(5), running.handle)
        .await
        .expect("pipeline did not stop")
        .unwrap();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Pipeline task aborted"));
    assert!(!running.shutdown.is_cancelled());
}

#[tokio::test]
async fn test_from_config_binds_port() {
    let mut config = rate_relay::config::Config::default();
    config.server.port = 0;
    config.pipeline.fetch_interval_secs = 1;
    config.pipeline.retention_secs = 10;

    let pipeline = Pipeline::from_config(&config, coindesk_provider().await)
        .await
        .unwrap();
    let addr = pipeline.local_addr().unwrap();
    assert_ne!(addr.port(), 0);

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(pipeline.run(shutdown.clone()));
    shutdown.cancel();
    assert!(handle.await.unwrap().is_ok());
}
