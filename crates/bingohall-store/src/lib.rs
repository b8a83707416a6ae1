//! Persistence interface for rooms and players.
//!
//! The engine never assumes a particular database. It talks to a
//! [`Store`]: point lookups, one unique secondary key (room code), one
//! list-by-foreign-key (room → players), per-record atomic patches and
//! inserts that assign ids.
//!
//! [`MemoryStore`] is the bundled backend, used by the server binary and
//! the tests.

mod error;
mod memory;
mod patch;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use patch::{NewPlayer, NewRoom, PlayerPatch, RoomPatch};
pub use store::Store;
