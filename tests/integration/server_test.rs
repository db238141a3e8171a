//! Integration tests for the WebSocket rate server

use crate::common::{connect, eventually, expect_closed, local_listener, next_update};
use chrono::{TimeZone, Utc};
use futures_util::SinkExt;
use rate_relay::broadcast::{BroadcastError, Broadcaster, RateSubscriber};
use rate_relay::cache::{RateRepository, RingCache};
use rate_relay::rate::RateUpdate;
use rate_relay::server::RateServer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

struct Harness {
    addr: SocketAddr,
    broadcaster: Arc<Broadcaster>,
    cache: Arc<RingCache>,
    inbound: mpsc::Sender<RateUpdate>,
    shutdown: CancellationToken,
}

async fn start_server(cache_capacity: usize, queue_capacity: usize) -> Harness {
    let broadcaster = Arc::new(Broadcaster::new(queue_capacity));
    let cache = Arc::new(RingCache::new(cache_capacity));
    let (inbound, updates) = mpsc::channel(16);
    let fan_out = broadcaster.clone();
    tokio::spawn(async move { fan_out.run(updates).await });

    let (listener, addr) = local_listener().await;
    let shutdown = CancellationToken::new();
    let server = RateServer::new(broadcaster.clone(), cache.clone());
    let token = shutdown.clone();
    tokio::spawn(async move { server.serve(listener, token).await.unwrap() });

    Harness {
        addr,
        broadcaster,
        cache,
        inbound,
        shutdown,
    }
}

fn update(secs: i64, rate: &str) -> RateUpdate {
    RateUpdate::new("BTC", "USD", Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap(), rate)
}

#[tokio::test]
async fn test_health() {
    let harness = start_server(4, 4).await;

    let response = reqwest::get(format!("http://{}/health", harness.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_streams_live_updates() {
    let harness = start_server(4, 4).await;
    let mut client = connect(harness.addr, "").await;
    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 1).await;

    harness.inbound.send(update(1, "100.00")).await.unwrap();
    harness.inbound.send(update(2, "101.00")).await.unwrap();

    assert_eq!(next_update(&mut client).await, update(1, "100.00"));
    assert_eq!(next_update(&mut client).await, update(2, "101.00"));
}

#[tokio::test]
async fn test_wire_format() {
    let harness = start_server(4, 4).await;
    let mut client = connect(harness.addr, "").await;
    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 1).await;

    harness.inbound.send(update(0, "42,500.5012")).await.unwrap();

    let msg = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        use futures_util::StreamExt;
        client.next().await.unwrap().unwrap()
    })
    .await
    .unwrap();
    let Message::Text(text) = msg else {
        panic!("expected text frame");
    };
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "from": "BTC",
            "to": "USD",
            "at": "2024-01-01T00:00:00Z",
            "rate": "42,500.5012"
        })
    );
}

#[tokio::test]
async fn test_replays_cache_before_streaming() {
    let harness = start_server(2, 4).await;
    harness.cache.insert(update(1, "100.00"));
    harness.cache.insert(update(2, "101.00"));
    harness.cache.insert(update(3, "102.00"));

    let since = 1_704_067_200;
    let mut client = connect(harness.addr, &format!("?since={since}")).await;

    assert_eq!(next_update(&mut client).await.rate, "101.00");
    assert_eq!(next_update(&mut client).await.rate, "102.00");

    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 1).await;
    harness.inbound.send(update(4, "103.00")).await.unwrap();
    assert_eq!(next_update(&mut client).await.rate, "103.00");
}

#[tokio::test]
async fn test_replay_accepts_rfc3339() {
    let harness = start_server(4, 4).await;
    harness.cache.insert(update(10, "1"));
    harness.cache.insert(update(20, "2"));

    let mut client = connect(harness.addr, "?since=2024-01-01T00:00:15Z").await;
    assert_eq!(next_update(&mut client).await.rate, "2");
}

#[tokio::test]
async fn test_empty_since_streams_without_replay() {
    let harness = start_server(4, 4).await;
    harness.cache.insert(update(1, "cached"));

    let mut client = connect(harness.addr, "?since=").await;
    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 1).await;

    harness.inbound.send(update(2, "live")).await.unwrap();
    assert_eq!(next_update(&mut client).await.rate, "live");
}

#[tokio::test]
async fn test_invalid_since_is_rejected() {
    let harness = start_server(4, 4).await;

    let url = format!("ws://{}/rates?since=yesterday", harness.addr);
    let err = tokio_tungstenite::connect_async(url).await.unwrap_err();
    match err {
        tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 400);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.broadcaster.subscription_count(), 0);
}

#[tokio::test]
async fn test_disconnect_unsubscribes() {
    let harness = start_server(4, 4).await;
    let mut client = connect(harness.addr, "").await;
    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 1).await;

    client.send(Message::Close(None)).await.unwrap();
    drop(client);

    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 0).await;
}

#[tokio::test]
async fn test_broadcaster_close_ends_session() {
    let harness = start_server(4, 4).await;
    let mut client = connect(harness.addr, "").await;
    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 1).await;

    harness.shutdown.cancel();
    harness.broadcaster.close();

    expect_closed(&mut client).await;
}

#[tokio::test]
async fn test_each_client_gets_own_subscription() {
    let harness = start_server(4, 4).await;
    let mut first = connect(harness.addr, "").await;
    let mut second = connect(harness.addr, "").await;
    let broadcaster = harness.broadcaster.clone();
    eventually(|| broadcaster.subscription_count() == 2).await;

    harness.inbound.send(update(1, "7")).await.unwrap();

    assert_eq!(next_update(&mut first).await.rate, "7");
    assert_eq!(next_update(&mut second).await.rate, "7");
}

/// Subscriber that refuses every subscription
struct RefusingSubscriber;

impl RateSubscriber for RefusingSubscriber {
    fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<RateUpdate>, BroadcastError> {
        Err(BroadcastError::DuplicateSubscription(id.to_string()))
    }

    fn unsubscribe(&self, _id: &str) {}
}

#[tokio::test]
async fn test_subscription_failure_closes_connection() {
    let (listener, addr) = local_listener().await;
    let server = RateServer::new(Arc::new(RefusingSubscriber), Arc::new(RingCache::new(4)));
    tokio::spawn(async move { server.serve(listener, CancellationToken::new()).await });

    let mut client = connect(addr, "").await;
    expect_closed(&mut client).await;
}
