//! Identity types.
//!
//! Every identifier is a newtype so a `RoomId` can never be passed where a
//! `PlayerId` is expected. Player slots are kept numeric internally and
//! only become the `"player3"` display string when serialized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Store-assigned ids
// ---------------------------------------------------------------------------

/// Store-assigned identifier of a room.
///
/// Serializes as a plain number (`#[serde(transparent)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Store-assigned identifier of a player row.
///
/// This is the row key, not the in-room seat. Game operations address
/// players by `(RoomId, PlayerSlot)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PlayerSlot
// ---------------------------------------------------------------------------

/// A player's seat in a room, numbered from 1 in join order.
///
/// On the wire a slot is the string `"player<N>"`. Inside the process it
/// is just the number, so turn rotation never parses strings.
///
/// ```rust
/// use bingohall_protocol::PlayerSlot;
///
/// let slot: PlayerSlot = "player3".parse().unwrap();
/// assert_eq!(slot.number(), 3);
/// assert_eq!(slot.to_string(), "player3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerSlot(u8);

impl PlayerSlot {
    /// The room creator's slot, and the slot that always opens a game.
    pub const FIRST: PlayerSlot = PlayerSlot(1);

    const PREFIX: &'static str = "player";

    /// Creates a slot from its 1-based number. Returns `None` for 0.
    pub const fn new(number: u8) -> Option<Self> {
        if number == 0 { None } else { Some(Self(number)) }
    }

    /// The 1-based slot number (also the player's join order).
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for PlayerSlot {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidSlot(s.to_string());
        let digits = s.strip_prefix(Self::PREFIX).ok_or_else(invalid)?;
        // Digits only, and no leading zero: "player01" would not round-trip.
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let number: u8 = digits.parse().map_err(|_| invalid())?;
        Self::new(number).ok_or_else(invalid)
    }
}

impl TryFrom<String> for PlayerSlot {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlayerSlot> for String {
    fn from(slot: PlayerSlot) -> Self {
        slot.to_string()
    }
}

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The six-character code players type to find a room (e.g. `"K7QX2M"`).
///
/// Always stored upper-case. Parsing trims whitespace and upper-cases, so
/// `" k7qx2m "` and `"K7QX2M"` name the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in every code.
    pub const LEN: usize = 6;

    /// Characters a generated code is drawn from.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Normalizes and validates a user-supplied code.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if normalized.len() != Self::LEN
            || !normalized.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidRoomCode(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Borrows the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}
