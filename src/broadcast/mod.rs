//! Fan-out broadcasting module
//!
//! Multiplexes the single inbound rate stream to any number of independently
//! paced subscribers. Each subscriber owns a bounded queue; when it is full
//! the update is dropped for that subscriber only.

mod broadcaster;
mod types;

pub use broadcaster::Broadcaster;
pub use types::BroadcastError;

use crate::rate::RateUpdate;
use tokio::sync::mpsc;

/// Trait for registering consumers of the rate stream
pub trait RateSubscriber: Send + Sync {
    /// Register a new subscription under `id`
    fn subscribe(&self, id: &str) -> Result<mpsc::Receiver<RateUpdate>, BroadcastError>;
    /// Remove and close the subscription for `id`, if any
    fn unsubscribe(&self, id: &str);
}
