//! Serve command implementation

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::provider::{CoinDeskClient, CoinDeskConfig};
use clap::Args;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// HTTP server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Currencies to publish the BTC rate in (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub currencies: Option<Vec<String>>,

    /// Seconds between provider fetches
    #[arg(short, long)]
    pub interval_secs: Option<u64>,

    /// Seconds of history kept for replay
    #[arg(long)]
    pub retention_secs: Option<u64>,

    /// Per-subscriber queue capacity
    #[arg(short, long)]
    pub buffer_size: Option<usize>,

    /// Provider base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Provider request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ServeArgs {
    /// Override file configuration with the flags that were given
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref currencies) = self.currencies {
            config.provider.currencies = currencies.clone();
        }
        if let Some(secs) = self.interval_secs {
            config.pipeline.fetch_interval_secs = secs;
        }
        if let Some(secs) = self.retention_secs {
            config.pipeline.retention_secs = secs;
        }
        if let Some(size) = self.buffer_size {
            config.pipeline.subscription_buffer_size = size;
        }
        if let Some(ref url) = self.base_url {
            config.provider.base_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.provider.timeout_ms = ms;
        }
        if let Some(ref level) = self.log_level {
            config.telemetry.log_level = level.clone();
        }
    }

    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let provider = CoinDeskClient::with_config(CoinDeskConfig {
            base_url: config.provider.base_url.clone(),
            timeout: config.provider.timeout(),
        })?;
        let pipeline = Pipeline::from_config(&config, Arc::new(provider)).await?;

        let shutdown = CancellationToken::new();
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        });

        pipeline.run(shutdown).await
    }
}

/// Resolve on Ctrl+C or, on unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
