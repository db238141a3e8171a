//! Rate update types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single exchange rate observation
///
/// The rate is kept as the exact decimal string the provider sent so that no
/// precision is lost between ingestion and delivery.
///
/// On the wire, `from` is always `"BTC"` and `to` is the quoted currency, so
/// `{"from":"BTC","to":"USD","rate":"42,500.50"}` reads as one BTC costing
/// 42,500.50 USD. Earlier relays that labelled the pair the other way round
/// (`from` = currency, `to` = `"BTC"`) carried the same rate value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateUpdate {
    /// Source currency code (e.g., "BTC")
    pub from: String,
    /// Target currency code (e.g., "USD")
    pub to: String,
    /// Provider observation time
    pub at: DateTime<Utc>,
    /// Decimal rate, verbatim from the provider
    pub rate: String,
}

impl RateUpdate {
    /// Create a new rate update
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        at: DateTime<Utc>,
        rate: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            at,
            rate: rate.into(),
        }
    }
}
