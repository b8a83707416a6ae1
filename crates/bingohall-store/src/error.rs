//! Error types for the store layer.

use bingohall_protocol::{PlayerId, RoomCode, RoomId};

/// Errors a [`Store`](crate::Store) backend can return.
///
/// Missing rows on *lookup* are `Ok(None)`, not errors. These variants are
/// for writes that target a row which isn't there, uniqueness violations,
/// and backend failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A patch or delete targeted a room that doesn't exist.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// A patch or delete targeted a player that doesn't exist.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// Another room already uses this code.
    #[error("room code {0} is already taken")]
    DuplicateRoomCode(RoomCode),

    /// The backend could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
