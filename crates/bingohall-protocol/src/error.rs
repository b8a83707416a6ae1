//! Error types for the protocol layer.

/// Errors that can occur while encoding, decoding or parsing wire values.
///
/// A `ProtocolError` always means the bytes or strings coming in were
/// malformed. Game rule violations live in the engine's error type.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (malformed JSON, missing fields, wrong types).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A player slot string was not of the form `player<N>` with `N >= 1`.
    #[error("invalid player slot {0:?}")]
    InvalidSlot(String),

    /// A room code was not six letters or digits.
    #[error("invalid room code {0:?}: expected 6 letters or digits")]
    InvalidRoomCode(String),

    /// The message decoded fine but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
