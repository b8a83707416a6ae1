//! The `Store` trait.

use std::future::Future;

use bingohall_protocol::{Player, PlayerId, PlayerSlot, Room, RoomCode, RoomId};

use crate::{NewPlayer, NewRoom, PlayerPatch, RoomPatch, StoreError};

/// Row storage for rooms and players.
///
/// Each call is atomic on its own record. The engine serializes work per
/// room above this layer, so a backend only needs single-record
/// atomicity, not multi-row transactions.
///
/// Methods return `impl Future + Send` so the engine's futures stay `Send`
/// and can run on Tokio's multi-threaded runtime. Implementations can
/// still write them as `async fn`.
pub trait Store: Send + Sync + 'static {
    /// Inserts a room and returns it with its assigned id.
    ///
    /// # Errors
    /// [`StoreError::DuplicateRoomCode`] if the code is already in use.
    fn insert_room(
        &self,
        room: NewRoom,
    ) -> impl Future<Output = Result<Room, StoreError>> + Send;

    /// Looks a room up by id.
    fn room(
        &self,
        id: RoomId,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send;

    /// Looks a room up by its unique share code.
    fn room_by_code(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<Room>, StoreError>> + Send;

    /// Applies `patch` to a room and returns the updated row.
    fn patch_room(
        &self,
        id: RoomId,
        patch: RoomPatch,
    ) -> impl Future<Output = Result<Room, StoreError>> + Send;

    /// Deletes a room together with any player rows still attached to it.
    fn delete_room(
        &self,
        id: RoomId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Inserts a player into an existing room.
    fn insert_player(
        &self,
        player: NewPlayer,
    ) -> impl Future<Output = Result<Player, StoreError>> + Send;

    /// Looks a player up by room and seat.
    fn player(
        &self,
        room_id: RoomId,
        slot: PlayerSlot,
    ) -> impl Future<Output = Result<Option<Player>, StoreError>> + Send;

    /// Every player in a room. Order is unspecified; callers sort by
    /// `join_order` when it matters.
    fn players_in_room(
        &self,
        room_id: RoomId,
    ) -> impl Future<Output = Result<Vec<Player>, StoreError>> + Send;

    /// Applies `patch` to a player and returns the updated row.
    fn patch_player(
        &self,
        id: PlayerId,
        patch: PlayerPatch,
    ) -> impl Future<Output = Result<Player, StoreError>> + Send;

    /// Deletes a player row.
    fn delete_player(
        &self,
        id: PlayerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
