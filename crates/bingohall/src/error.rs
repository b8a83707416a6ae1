//! Unified error type for the Bingohall server.

use bingohall_protocol::ProtocolError;
use bingohall_room::EngineError;
use bingohall_store::StoreError;

/// Errors that can occur in the socket layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener or accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade was refused or malformed.
    #[error("websocket handshake failed: {0}")]
    HandshakeFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Writing a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tokio_tungstenite::tungstenite::Error),
}

/// Top-level error that wraps every layer's error.
///
/// `#[from]` on each variant lets `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum BingoError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
