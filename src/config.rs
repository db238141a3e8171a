//! Configuration types for rate-relay

use crate::cache::{capacity_for, MAX_CAPACITY};
use crate::provider::COINDESK_API_URL;
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Rate provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Currencies to publish the BTC rate in
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
}

fn default_base_url() -> String {
    COINDESK_API_URL.to_string()
}
fn default_timeout_ms() -> u64 {
    1000
}
fn default_currencies() -> Vec<String> {
    vec!["USD".to_string()]
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            currencies: default_currencies(),
        }
    }
}

impl ProviderConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fetch, fan-out and cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Interval between provider fetches (seconds)
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,

    /// How long updates stay available for replay (seconds)
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,

    /// Per-subscriber queue capacity
    #[serde(default = "default_subscription_buffer_size")]
    pub subscription_buffer_size: usize,
}

fn default_fetch_interval_secs() -> u64 {
    5
}
fn default_retention_secs() -> u64 {
    86_400 // 24 hours
}
fn default_subscription_buffer_size() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: default_fetch_interval_secs(),
            retention_secs: default_retention_secs(),
            subscription_buffer_size: default_subscription_buffer_size(),
        }
    }
}

impl PipelineConfig {
    /// Interval between provider fetches
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    /// Replay retention window
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Number of replay cache slots for the retention window
    pub fn cache_capacity(&self) -> usize {
        capacity_for(self.retention(), self.fetch_interval())
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port, disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check settings that would otherwise fail at runtime
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.pipeline.fetch_interval_secs > 0,
            "pipeline.fetch_interval_secs must be greater than zero"
        );
        anyhow::ensure!(
            self.pipeline.subscription_buffer_size > 0,
            "pipeline.subscription_buffer_size must be greater than zero"
        );
        anyhow::ensure!(
            self.pipeline.cache_capacity() > 0,
            "pipeline.retention_secs must cover at least one fetch interval"
        );
        anyhow::ensure!(
            self.pipeline.cache_capacity() <= MAX_CAPACITY,
            "pipeline.retention_secs / fetch_interval_secs must not exceed {} cache slots",
            MAX_CAPACITY
        );
        anyhow::ensure!(
            !self.provider.currencies.is_empty(),
            "provider.currencies must not be empty"
        );
        anyhow::ensure!(
            self.provider.timeout_ms > 0,
            "provider.timeout_ms must be greater than zero"
        );
        Ok(())
    }
}
