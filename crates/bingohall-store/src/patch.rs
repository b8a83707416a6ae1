//! Insert and patch payloads.
//!
//! A patch names only the fields it changes. Fields that can be cleared
//! are `Option<Option<T>>`: `None` leaves the field alone, `Some(None)`
//! clears it.

use std::collections::BTreeSet;

use bingohall_protocol::{
    Player, PlayerId, PlayerSlot, Room, RoomCode, RoomId, RoomStatus,
};

/// A room row before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub max_players: u8,
    pub player_count: u8,
    pub grid_size: usize,
    pub total_numbers: usize,
    pub expires_at: u64,
    pub created_at: u64,
}

impl NewRoom {
    pub(crate) fn into_room(self, id: RoomId) -> Room {
        Room {
            id,
            code: self.code,
            status: self.status,
            max_players: self.max_players,
            player_count: self.player_count,
            grid_size: self.grid_size,
            total_numbers: self.total_numbers,
            current_turn: None,
            winner: None,
            turn_expires_at: None,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

/// A player row before the store assigns its id. Cards start empty.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub room_id: RoomId,
    pub slot: PlayerSlot,
    pub name: String,
    pub avatar: String,
}

impl NewPlayer {
    pub(crate) fn into_player(self, id: PlayerId) -> Player {
        Player {
            id,
            room_id: self.room_id,
            slot: self.slot,
            name: self.name,
            avatar: self.avatar,
            join_order: self.slot.number(),
            board: Vec::new(),
            marked_positions: BTreeSet::new(),
        }
    }
}

/// Partial update of a room row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPatch {
    pub status: Option<RoomStatus>,
    pub player_count: Option<u8>,
    pub current_turn: Option<Option<PlayerSlot>>,
    pub winner: Option<Option<PlayerSlot>>,
    pub turn_expires_at: Option<Option<u64>>,
}

impl RoomPatch {
    /// Writes every named field onto `room`.
    pub fn apply(&self, room: &mut Room) {
        if let Some(status) = self.status {
            room.status = status;
        }
        if let Some(count) = self.player_count {
            room.player_count = count;
        }
        if let Some(turn) = self.current_turn {
            room.current_turn = turn;
        }
        if let Some(winner) = self.winner {
            room.winner = winner;
        }
        if let Some(expires) = self.turn_expires_at {
            room.turn_expires_at = expires;
        }
    }
}

/// Partial update of a player row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerPatch {
    pub board: Option<Vec<u32>>,
    pub marked_positions: Option<BTreeSet<usize>>,
}

impl PlayerPatch {
    /// Writes every named field onto `player`.
    pub fn apply(&self, player: &mut Player) {
        if let Some(board) = &self.board {
            player.board.clone_from(board);
        }
        if let Some(marked) = &self.marked_positions {
            player.marked_positions.clone_from(marked);
        }
    }
}
