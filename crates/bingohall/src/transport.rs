//! WebSocket listener and connections, on `tokio-tungstenite`.
//!
//! A connection is split into a [`FrameWriter`] and a [`FrameReader`] so
//! the handler can push events while it waits for the next request.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::TransportError;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<TcpStream>;

/// Opaque identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts WebSocket connections on a TCP port.
pub(crate) struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    pub(crate) async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket listener bound");
        Ok(Self { listener })
    }

    pub(crate) fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection.
    ///
    /// The WebSocket upgrade is left to [`PendingConnection::upgrade`] so a
    /// slow client cannot stall the accept loop.
    pub(crate) async fn accept(
        &self,
    ) -> Result<PendingConnection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingConnection { stream, peer })
    }
}

/// A TCP connection that has not completed the WebSocket handshake.
pub(crate) struct PendingConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl PendingConnection {
    pub(crate) async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let ws = tokio_tungstenite::accept_async(self.stream)
            .await
            .map_err(TransportError::HandshakeFailed)?;
        let id =
            ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, peer = %self.peer, "accepted WebSocket connection");
        Ok(WebSocketConnection { id, ws })
    }
}

/// A single upgraded WebSocket connection.
pub(crate) struct WebSocketConnection {
    id: ConnectionId,
    ws: WsStream,
}

impl WebSocketConnection {
    pub(crate) fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn split(self) -> (FrameWriter, FrameReader) {
        let (sink, stream) = self.ws.split();
        (FrameWriter { sink }, FrameReader { stream })
    }
}

/// Sending half of a connection.
pub(crate) struct FrameWriter {
    sink: SplitSink<WsStream, Message>,
}

impl FrameWriter {
    pub(crate) async fn send(&mut self, data: Vec<u8>) -> Result<(), TransportError> {
        self.sink
            .send(Message::Binary(data.into()))
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Sends a close frame.
    pub(crate) async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await.map_err(TransportError::SendFailed)
    }
}

/// Receiving half of a connection.
pub(crate) struct FrameReader {
    stream: SplitStream<WsStream>,
}

impl FrameReader {
    /// The next data frame. Text and binary frames are both accepted.
    ///
    /// Returns `Ok(None)` when the peer closed the connection.
    pub(crate) async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }
}
