//! Concurrent start-up and ordered shutdown of the rate pipeline

use crate::broadcast::{Broadcaster, RateSubscriber};
use crate::cache::{Persister, RingCache};
use crate::config::Config;
use crate::fetcher::PeriodicFetcher;
use crate::provider::RateProvider;
use crate::server::RateServer;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Capacity of the channel between the fetcher and the broadcaster
pub const INBOUND_CAPACITY: usize = 1;

/// The assembled rate pipeline, ready to run
pub struct Pipeline {
    fetcher: Arc<PeriodicFetcher>,
    broadcaster: Arc<Broadcaster>,
    cache: Arc<RingCache>,
    listener: TcpListener,
}

impl Pipeline {
    /// Assemble a pipeline from already built components
    pub fn new(
        fetcher: Arc<PeriodicFetcher>,
        broadcaster: Arc<Broadcaster>,
        cache: Arc<RingCache>,
        listener: TcpListener,
    ) -> Self {
        Self {
            fetcher,
            broadcaster,
            cache,
            listener,
        }
    }

    /// Build every component from configuration and bind the server port
    pub async fn from_config(
        config: &Config,
        provider: Arc<dyn RateProvider>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(PeriodicFetcher::new(
            provider,
            config.provider.currencies.clone(),
            config.pipeline.fetch_interval(),
        ));
        let broadcaster = Arc::new(Broadcaster::new(config.pipeline.subscription_buffer_size));
        let cache = Arc::new(RingCache::new(config.pipeline.cache_capacity()));
        let listener = RateServer::bind(config.server.port).await?;

        tracing::info!(
            cache_capacity = cache.capacity(),
            subscription_buffer_size = config.pipeline.subscription_buffer_size,
            "Pipeline assembled"
        );

        Ok(Self::new(fetcher, broadcaster, cache, listener))
    }

    /// Address the server is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until `shutdown` is cancelled or a component fails
    ///
    /// Shutdown order: server, broadcaster, fetcher, then the inbound
    /// channel. Returns the first component failure, if any.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let Pipeline {
            fetcher,
            broadcaster,
            cache,
            listener,
        } = self;

        let (updates_tx, updates_rx) = mpsc::channel(INBOUND_CAPACITY);
        let server_shutdown = CancellationToken::new();
        let mut tasks: JoinSet<anyhow::Result<()>> = JoinSet::new();

        // Registered before the fan-out loop starts so the cache sees every update
        let cache_updates = broadcaster
            .subscribe(&Uuid::new_v4().to_string())
            .context("Failed to register cache subscription")?;
        let persister = Persister::new(cache.clone());
        tasks.spawn(async move {
            persister.persist_updates(cache_updates).await;
            Ok(())
        });

        let fan_out = Arc::clone(&broadcaster);
        tasks.spawn(async move {
            fan_out.run(updates_rx).await;
            Ok(())
        });

        let poller = Arc::clone(&fetcher);
        let outbound = updates_tx.clone();
        tasks.spawn(async move {
            poller.run(outbound).await;
            Ok(())
        });

        let server = RateServer::new(broadcaster.clone(), cache);
        let server_token = server_shutdown.clone();
        tasks.spawn(async move {
            server
                .serve(listener, server_token)
                .await
                .context("Rate server failed")
        });

        let mut failure = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested");
                None
            }
            failure = wait_for_failure(&mut tasks) => failure,
        };
        if let Some(ref e) = failure {
            tracing::error!(error = %e, "Pipeline component failed, shutting down");
        }

        server_shutdown.cancel();
        broadcaster.close();
        fetcher.close().await;
        drop(updates_tx);

        while let Some(result) = tasks.join_next().await {
            if let Some(e) = task_failure(result) {
                tracing::error!(error = %e, "Pipeline component failed during shutdown");
                failure.get_or_insert(e);
            }
        }

        tracing::info!("Pipeline stopped");
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Wait for the first task to fail
///
/// Tasks that finish cleanly are skipped. Returns `None` once every task has
/// finished without failing.
async fn wait_for_failure(tasks: &mut JoinSet<anyhow::Result<()>>) -> Option<anyhow::Error> {
    while let Some(result) = tasks.join_next().await {
        if let Some(e) = task_failure(result) {
            return Some(e);
        }
    }
    None
}

fn task_failure(
    result: Result<anyhow::Result<()>, tokio::task::JoinError>,
) -> Option<anyhow::Error> {
    match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(e) => Some(anyhow::anyhow!("Pipeline task aborted: {}", e)),
    }
}
