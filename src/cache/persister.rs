//! Forwards a broadcaster subscription into a repository

use super::RateRepository;
use crate::rate::RateUpdate;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Writes every update received on a subscription queue into a repository
pub struct Persister {
    repository: Arc<dyn RateRepository>,
}

impl Persister {
    /// Create a new persister for the given repository
    pub fn new(repository: Arc<dyn RateRepository>) -> Self {
        Self { repository }
    }

    /// Drain `updates` into the repository until the queue is closed
    pub async fn persist_updates(&self, mut updates: mpsc::Receiver<RateUpdate>) {
        while let Some(update) = updates.recv().await {
            self.repository.insert(update);
        }
        tracing::debug!("Update queue closed, persister stopping");
    }
}
