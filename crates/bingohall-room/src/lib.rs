//! Room lifecycle and the turn state machine for Bingohall.
//!
//! [`GameEngine`] is the only writer of room and player rows. It runs every
//! operation on a room under that room's lock, consults the pure rules in
//! `bingohall-grid`, persists through a [`Store`](bingohall_store::Store),
//! and arms turn timers on a [`Scheduler`](bingohall_timer::Scheduler).
//!
//! # Key types
//!
//! - [`GameEngine`]: create/join/exit, `configure_board`, `mark`,
//!   `rematch`, auto-pass and read queries
//! - [`EngineConfig`]: turn length, timer tolerance, room TTL, ...
//! - [`EngineError`]: every failure, with a wire [`ErrorKind`](bingohall_protocol::ErrorKind)
//! - [`TurnTimeout`] / [`AutoPass`]: what a turn timer carries and what
//!   it did when it fired

mod config;
mod engine;
mod error;
mod events;
mod locks;

pub use config::EngineConfig;
pub use engine::{
    AutoPass, DEFAULT_AVATAR, ExitOutcome, GameEngine, MarkOutcome, Seat,
    TurnTimeout,
};
pub use error::EngineError;
