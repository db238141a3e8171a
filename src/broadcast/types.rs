//! Broadcasting types

use thiserror::Error;

/// Broadcaster errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    /// Another live subscription already uses this identifier
    #[error("Subscription already exists: {0}")]
    DuplicateSubscription(String),
    /// Broadcaster has been closed and accepts no new subscriptions
    #[error("Broadcaster is closed")]
    Closed,
}
