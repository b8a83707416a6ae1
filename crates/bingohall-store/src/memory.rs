//! In-memory [`Store`] backend.
//!
//! Rows live in `HashMap`s behind one `tokio::sync::RwLock`. Two side
//! indexes are kept in sync with the primary maps, the same way a
//! database would maintain them:
//!
//! - `codes`: room code → room id (unique)
//! - `by_room`: room id → player ids, in insertion order

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bingohall_protocol::{Player, PlayerId, PlayerSlot, Room, RoomCode, RoomId};
use tokio::sync::RwLock;

use crate::{NewPlayer, NewRoom, PlayerPatch, RoomPatch, Store, StoreError};

#[derive(Default)]
struct Tables {
    rooms: HashMap<RoomId, Room>,
    codes: HashMap<RoomCode, RoomId>,
    players: HashMap<PlayerId, Player>,
    by_room: HashMap<RoomId, Vec<PlayerId>>,
}

/// A [`Store`] that keeps everything in process memory.
///
/// Nothing survives a restart.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_room_id: AtomicU64,
    next_player_id: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store. Ids start at 1.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_room_id: AtomicU64::new(1),
            next_player_id: AtomicU64::new(1),
        }
    }

    /// Number of rooms currently stored.
    pub async fn room_count(&self) -> usize {
        self.tables.read().await.rooms.len()
    }

    /// Number of player rows currently stored, across all rooms.
    pub async fn player_count(&self) -> usize {
        self.tables.read().await.players.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    async fn insert_room(&self, new: NewRoom) -> Result<Room, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.codes.contains_key(&new.code) {
            return Err(StoreError::DuplicateRoomCode(new.code));
        }

        let id = RoomId(self.next_room_id.fetch_add(1, Ordering::Relaxed));
        let room = new.into_room(id);
        tables.codes.insert(room.code.clone(), id);
        tables.by_room.insert(id, Vec::new());
        tables.rooms.insert(id, room.clone());

        tracing::trace!(room_id = %id, code = %room.code, "room row inserted");
        Ok(room)
    }

    async fn room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.tables.read().await.rooms.get(&id).cloned())
    }

    async fn room_by_code(
        &self,
        code: &RoomCode,
    ) -> Result<Option<Room>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.rooms.get(id))
            .cloned())
    }

    async fn patch_room(
        &self,
        id: RoomId,
        patch: RoomPatch,
    ) -> Result<Room, StoreError> {
        let mut tables = self.tables.write().await;
        let room = tables
            .rooms
            .get_mut(&id)
            .ok_or(StoreError::RoomNotFound(id))?;
        patch.apply(room);
        Ok(room.clone())
    }

    async fn delete_room(&self, id: RoomId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let room = tables
            .rooms
            .remove(&id)
            .ok_or(StoreError::RoomNotFound(id))?;
        tables.codes.remove(&room.code);
        let player_ids = tables.by_room.remove(&id).unwrap_or_default();
        for player_id in player_ids {
            tables.players.remove(&player_id);
        }
        tracing::trace!(room_id = %id, "room row deleted");
        Ok(())
    }

    async fn insert_player(
        &self,
        new: NewPlayer,
    ) -> Result<Player, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.rooms.contains_key(&new.room_id) {
            return Err(StoreError::RoomNotFound(new.room_id));
        }

        let id =
            PlayerId(self.next_player_id.fetch_add(1, Ordering::Relaxed));
        let player = new.into_player(id);
        tables
            .by_room
            .entry(player.room_id)
            .or_default()
            .push(id);
        tables.players.insert(id, player.clone());
        Ok(player)
    }

    async fn player(
        &self,
        room_id: RoomId,
        slot: PlayerSlot,
    ) -> Result<Option<Player>, StoreError> {
        let tables = self.tables.read().await;
        let found = tables
            .by_room
            .get(&room_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.players.get(id))
            .find(|p| p.slot == slot)
            .cloned();
        Ok(found)
    }

    async fn players_in_room(
        &self,
        room_id: RoomId,
    ) -> Result<Vec<Player>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .by_room
            .get(&room_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.players.get(id))
            .cloned()
            .collect())
    }

    async fn patch_player(
        &self,
        id: PlayerId,
        patch: PlayerPatch,
    ) -> Result<Player, StoreError> {
        let mut tables = self.tables.write().await;
        let player = tables
            .players
            .get_mut(&id)
            .ok_or(StoreError::PlayerNotFound(id))?;
        patch.apply(player);
        Ok(player.clone())
    }

    async fn delete_player(&self, id: PlayerId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let player = tables
            .players
            .remove(&id)
            .ok_or(StoreError::PlayerNotFound(id))?;
        if let Some(ids) = tables.by_room.get_mut(&player.room_id) {
            ids.retain(|pid| *pid != id);
        }
        Ok(())
    }
}
