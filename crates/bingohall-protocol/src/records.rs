//! Room and player records, plus the room state machine.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, PlayerSlot, RoomCode, RoomId};

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
///            ┌──────── rematch ─────────┐
///            ▼                          │
/// Waiting ──(all boards)──→ Playing ──(win)──→ Finished
///            ▲               │   ▲ (rematch)    │
///            └── rematch ────┘   └── rematch ───┘
/// ```
///
/// - **Waiting**: players join and configure their cards.
/// - **Playing**: turns rotate; `current_turn` is always set.
/// - **Finished**: somebody won; `winner` is always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Returns `true` while turns are being taken.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Returns `true` if moving from `self` to `target` is a legal transition.
    ///
    /// `Playing → Playing` is legal: a rematch that keeps boards restarts
    /// the game without leaving the playing state.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Playing)
                | (Self::Playing, Self::Finished)
                | (Self::Playing, Self::Waiting)
                | (Self::Playing, Self::Playing)
                | (Self::Finished, Self::Waiting)
                | (Self::Finished, Self::Playing)
        )
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A room row.
///
/// Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: RoomCode,
    pub status: RoomStatus,
    /// Seats in the room (2..=6). Also fixes the grid size.
    pub max_players: u8,
    /// Players currently seated.
    pub player_count: u8,
    /// Cells per side: `max_players + 3`.
    pub grid_size: usize,
    /// `grid_size²`; card values are drawn from `1..=total_numbers`.
    pub total_numbers: usize,
    /// Whose turn it is. `Some` iff the room is playing.
    pub current_turn: Option<PlayerSlot>,
    /// Who won. `Some` iff the room is finished.
    pub winner: Option<PlayerSlot>,
    /// When the open turn auto-passes. `Some` only while a turn is open.
    pub turn_expires_at: Option<u64>,
    /// Advisory time-to-live for the whole room.
    pub expires_at: u64,
    pub created_at: u64,
}

impl Room {
    /// Number of cells every configured card must have.
    pub fn board_len(&self) -> usize {
        self.grid_size * self.grid_size
    }

    /// Returns `true` once every seat is taken.
    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player row: who they are and the state of their card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub slot: PlayerSlot,
    pub name: String,
    pub avatar: String,
    /// Equals `slot.number()`; kept so callers can sort without parsing.
    pub join_order: u8,
    /// Card values in row-major order, or empty before configuration.
    pub board: Vec<u32>,
    /// Card indices this player has crossed off.
    pub marked_positions: BTreeSet<usize>,
}

impl Player {
    /// Returns `true` if the card has been configured for a grid with
    /// `expected_len` cells.
    pub fn has_board(&self, expected_len: usize) -> bool {
        expected_len > 0 && self.board.len() == expected_len
    }

    /// Returns `true` if the card cell at `position` is crossed off.
    pub fn is_marked(&self, position: usize) -> bool {
        self.marked_positions.contains(&position)
    }

    /// Finds where `number` sits on this player's card.
    pub fn position_of(&self, number: u32) -> Option<usize> {
        self.board.iter().position(|&value| value == number)
    }
}
