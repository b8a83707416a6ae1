//! Wire protocol and shared records for Bingohall.
//!
//! This crate defines the vocabulary every other layer speaks:
//!
//! - **Identity** ([`RoomId`], [`PlayerId`], [`PlayerSlot`], [`RoomCode`]):
//!   typed identifiers, parsed once at the boundary.
//! - **Records** ([`Room`], [`Player`], [`RoomStatus`]): the rows the
//!   store keeps and the snapshots clients receive.
//! - **Messages** ([`Envelope`], [`ClientRequest`], [`ServerResponse`],
//!   [`RoomEvent`]): what travels over the socket.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): bytes in, bytes out.
//!
//! # Architecture
//!
//! ```text
//! Socket (bytes) → Protocol (Envelope) → Engine (rooms, players, turns)
//! ```
//!
//! Nothing in here knows about locking, timers or persistence.

mod codec;
mod error;
mod ids;
mod messages;
mod records;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use ids::{PlayerId, PlayerSlot, RoomCode, RoomId};
pub use messages::{
    ClientRequest, Envelope, ErrorKind, Payload, Reply, RoomEvent,
    ServerResponse,
};
pub use records::{Player, Room, RoomStatus};
