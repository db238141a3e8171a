//! rate-relay: real-time BTC exchange rate relay
//!
//! This library provides the core components for:
//! - Periodic rate fetching from the CoinDesk price index
//! - Fan-out broadcasting to independently paced subscribers
//! - A bounded replay cache for late-joining subscribers
//! - A WebSocket server streaming rate updates
//! - Supervised start-up and ordered shutdown of the pipeline

pub mod broadcast;
pub mod cache;
pub mod cli;
pub mod config;
pub mod fetcher;
pub mod pipeline;
pub mod provider;
pub mod rate;
pub mod server;
pub mod telemetry;
