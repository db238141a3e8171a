//! WebSocket rate server
//!
//! Serves `GET /rates` as a WebSocket stream of rate updates, optionally
//! replaying cached updates first, and `GET /health` for liveness checks.

mod handlers;
mod types;

pub use handlers::parse_since;
pub use types::ServerError;

use crate::broadcast::RateSubscriber;
use crate::cache::RateRepository;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub subscriber: Arc<dyn RateSubscriber>,
    pub repository: Arc<dyn RateRepository>,
}

/// HTTP server exposing the rate stream
pub struct RateServer {
    state: AppState,
}

impl RateServer {
    /// Create a new server over a subscriber registry and a replay repository
    pub fn new(subscriber: Arc<dyn RateSubscriber>, repository: Arc<dyn RateRepository>) -> Self {
        Self {
            state: AppState {
                subscriber,
                repository,
            },
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/rates", get(handlers::rates_handler))
            .route("/health", get(handlers::health_handler))
            .with_state(self.state.clone())
    }

    /// Bind a listener on all interfaces
    pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve until `shutdown` is cancelled
    ///
    /// Stops accepting connections on shutdown. Open WebSocket sessions end
    /// when their subscription queue is closed.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr().map_err(ServerError::Io)?;
        tracing::info!(%addr, "Rate server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(ServerError::Io)?;

        tracing::info!("Rate server stopped");
        Ok(())
    }
}
