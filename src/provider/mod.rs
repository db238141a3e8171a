//! Rate provider module
//!
//! The fetch capability used by the periodic fetcher, and its CoinDesk
//! implementation.

mod coindesk;
mod types;

pub use coindesk::{CoinDeskClient, CoinDeskConfig, COINDESK_API_URL};
pub use types::{ProviderError, RateSnapshot};

use async_trait::async_trait;

/// Trait for rate provider implementations
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch the current rate snapshot
    async fn fetch_snapshot(&self) -> Result<RateSnapshot, ProviderError>;
}
