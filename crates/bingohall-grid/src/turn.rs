//! Round-robin turn order.

use bingohall_protocol::PlayerSlot;

/// The slot after `current` in a room of `total_players`, wrapping from
/// the last seat back to [`PlayerSlot::FIRST`].
///
/// A `current` beyond `total_players` (stale after someone left) also
/// wraps to the first seat.
pub fn next_turn(current: PlayerSlot, total_players: u8) -> PlayerSlot {
    if current.number() >= total_players {
        return PlayerSlot::FIRST;
    }
    PlayerSlot::new(current.number() + 1).unwrap_or(PlayerSlot::FIRST)
}
