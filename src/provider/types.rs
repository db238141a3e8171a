//! Rate provider types

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// A point-in-time set of rates from a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSnapshot {
    /// Provider observation time
    pub observed_at: DateTime<Utc>,
    /// Currency code to decimal rate string
    pub rates: HashMap<String, String>,
}

/// Provider errors
///
/// All of these are treated as transient by the fetcher.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request could not be sent or the response body could not be read
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Provider answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Response body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
}
