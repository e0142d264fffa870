//! Transport errors.

use remote_agent_core::{ConfigError, FrameError};
use thiserror::Error;

/// Transport error.
///
/// Every variant except `Frame` and `Config` means the connection is lost and
/// must be re-established.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[cfg(feature = "websocket")]
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Connection closed")]
    Closed,
    #[error("Not connected")]
    NotConnected,
    #[error("Outbound writer stopped")]
    WriterStopped,
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
