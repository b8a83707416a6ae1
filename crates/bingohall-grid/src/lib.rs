//! Pure game rules for Bingohall.
//!
//! Nothing here touches the store, the clock or the network. Every
//! function is deterministic (apart from [`suggest_board`], which takes
//! the RNG as an argument) and is tested in isolation.
//!
//! # Key items
//!
//! - [`grid_size_for_players`]: player count → grid dimensions
//! - [`winning_lines`], [`completed_lines`], [`has_won`]: line geometry
//! - [`validate_board`]: card checks, returning the accepted card
//! - [`next_turn`]: round-robin turn order
//! - [`suggest_board`]: a random card that always validates

mod board;
mod geometry;
mod turn;

pub use board::{suggest_board, validate_board, BoardError};
pub use geometry::{
    bingo_letters, completed_lines, grid_size_for_players, has_won,
    winning_lines, GridDims, Line, LineKind, MAX_PLAYERS, MIN_PLAYERS,
};
pub use turn::next_turn;
