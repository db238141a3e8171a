//! CoinDesk Bitcoin Price Index client
//!
//! Fetches the current BTC price in every currency CoinDesk publishes from
//! `/v1/bpi/currentprice.json`.

use super::{ProviderError, RateProvider, RateSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// CoinDesk API base URL
pub const COINDESK_API_URL: &str = "https://api.coindesk.com";

/// Configuration for the CoinDesk client
#[derive(Debug, Clone)]
pub struct CoinDeskConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CoinDeskConfig {
    fn default() -> Self {
        Self {
            base_url: COINDESK_API_URL.to_string(),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Client for the CoinDesk price API
pub struct CoinDeskClient {
    config: CoinDeskConfig,
    client: Client,
}

impl CoinDeskClient {
    /// Create a new client with custom configuration
    pub fn with_config(config: CoinDeskConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Build the current price endpoint URL
    fn current_price_url(&self) -> String {
        format!(
            "{}/v1/bpi/currentprice.json",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl RateProvider for CoinDeskClient {
    async fn fetch_snapshot(&self) -> Result<RateSnapshot, ProviderError> {
        let url = self.current_price_url();

        tracing::debug!(url = %url, "Fetching CoinDesk current price");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status { status, body });
        }

        parse_current_price(&body)
    }
}

/// Current price response from CoinDesk
#[derive(Debug, Deserialize)]
struct CurrentPriceResponse {
    time: PriceTime,
    bpi: HashMap<String, PriceIndex>,
}

#[derive(Debug, Deserialize)]
struct PriceTime {
    #[serde(rename = "updatedISO")]
    updated_iso: DateTime<Utc>,
}

/// Per-currency entry of the price index
#[derive(Debug, Deserialize)]
struct PriceIndex {
    /// Formatted decimal rate (e.g., "42,500.5012")
    rate: String,
}

/// Parse a current price payload into a snapshot
fn parse_current_price(body: &str) -> Result<RateSnapshot, ProviderError> {
    let response: CurrentPriceResponse = serde_json::from_str(body)?;

    Ok(RateSnapshot {
        observed_at: response.time.updated_iso,
        rates: response
            .bpi
            .into_iter()
            .map(|(code, index)| (code, index.rate))
            .collect(),
    })
}
