//! `BingoServer` builder and accept loop.
//!
//! Ties the layers together: socket → codec → engine → store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bingohall_protocol::{Codec, JsonCodec};
use bingohall_room::{EngineConfig, GameEngine};
use bingohall_store::{MemoryStore, Store};

use crate::handler::handle_connection;
use crate::transport::WebSocketListener;
use crate::{BingoError, ServerConfig};

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<S: Store, C: Codec> {
    pub(crate) engine: Arc<GameEngine<S>>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Bingohall server.
///
/// # Example
///
/// ```rust,no_run
/// use bingohall::prelude::*;
///
/// # async fn run() -> Result<(), BingoError> {
/// let server = BingoServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BingoServerBuilder {
    config: ServerConfig,
}

impl BingoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets the game engine configuration.
    pub fn engine_config(mut self, config: EngineConfig) -> Self {
        self.config.engine = config;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and starts the engine on an in-memory store.
    pub async fn build(self) -> Result<BingoServer<MemoryStore>, BingoError> {
        self.build_with_store(MemoryStore::new()).await
    }

    /// Binds the listener and starts the engine on `store`.
    ///
    /// Must be called inside a Tokio runtime: the engine spawns its
    /// turn-timer task here.
    pub async fn build_with_store<S: Store>(
        self,
        store: S,
    ) -> Result<BingoServer<S>, BingoError> {
        let listener = WebSocketListener::bind(&self.config.bind_addr).await?;
        let engine = GameEngine::spawn(store, self.config.engine);

        let state = Arc::new(ServerState {
            engine,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        });
        Ok(BingoServer { listener, state })
    }
}

/// A bound Bingohall server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct BingoServer<S: Store, C: Codec = JsonCodec> {
    listener: WebSocketListener,
    state: Arc<ServerState<S, C>>,
}

impl BingoServer<MemoryStore> {
    /// Creates a new builder.
    pub fn builder() -> BingoServerBuilder {
        BingoServerBuilder::new()
    }
}

impl<S: Store, C: Codec> BingoServer<S, C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The engine behind this server, for in-process callers.
    pub fn engine(&self) -> Arc<GameEngine<S>> {
        Arc::clone(&self.state.engine)
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each connection is upgraded and served on its own task.
    pub async fn run(self) -> Result<(), BingoError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Bingohall server running");

        loop {
            match self.listener.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn = match pending.upgrade().await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(error = %e, "upgrade failed");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
