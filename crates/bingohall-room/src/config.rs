//! Engine configuration.

use std::time::Duration;

/// Tunables for a [`GameEngine`](crate::GameEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a player has to mark before the turn is passed for them.
    pub turn_duration: Duration,

    /// Slack when deciding whether a fired turn timer is still current.
    /// A timer acts only if the room's deadline is at most this far in
    /// the future.
    pub expiry_tolerance: Duration,

    /// Advisory lifetime of a room, recorded as `expires_at` on creation.
    pub room_ttl: Duration,

    /// Attempts at drawing an unused room code before giving up.
    pub code_attempts: u32,

    /// Per-room event buffer. Subscribers further behind than this miss
    /// events.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            turn_duration: Duration::from_secs(60),
            expiry_tolerance: Duration::from_secs(1),
            room_ttl: Duration::from_secs(24 * 60 * 60),
            code_attempts: 10,
            event_capacity: 64,
        }
    }
}
