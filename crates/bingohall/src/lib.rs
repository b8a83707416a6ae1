//! # Bingohall
//!
//! Server-authoritative multiplayer Bingo over WebSocket.
//!
//! Two to six players share a room, each fills in a personal card, and
//! turns rotate announcing numbers that are crossed off on every card at
//! once. The server owns all state; clients send requests and receive
//! replies plus live room events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bingohall::prelude::*;
//!
//! # async fn run() -> Result<(), BingoError> {
//! let server = BingoServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;
mod transport;

pub use config::ServerConfig;
pub use error::{BingoError, TransportError};
pub use server::{BingoServer, BingoServerBuilder};
pub use transport::ConnectionId;

/// Everything needed to run a server or talk to one.
pub mod prelude {
    pub use crate::{BingoError, BingoServer, BingoServerBuilder, ServerConfig};
    pub use bingohall_protocol::{
        ClientRequest, Envelope, ErrorKind, Payload, Player, PlayerSlot,
        Reply, Room, RoomCode, RoomEvent, RoomId, RoomStatus, ServerResponse,
    };
    pub use bingohall_room::{EngineConfig, GameEngine};
    pub use bingohall_store::{MemoryStore, Store};
}
