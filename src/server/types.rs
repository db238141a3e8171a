//! Server types

use std::net::SocketAddr;
use thiserror::Error;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// Serving failed
    #[error("Server I/O error: {0}")]
    Io(std::io::Error),
    /// `since` query parameter is neither unix seconds nor RFC 3339
    #[error("Invalid since parameter: {0}")]
    InvalidSince(String),
}
