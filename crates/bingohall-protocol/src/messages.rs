//! Messages that travel over the socket.
//!
//! Every frame is an [`Envelope`]. Clients send `Request`s; the server
//! answers each one with exactly one `Reply` carrying the request's `seq`,
//! and pushes `Event`s for rooms the client subscribed to.

use serde::{Deserialize, Serialize};

use crate::{Player, PlayerSlot, Room, RoomId};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Client → Server operations.
///
/// `#[serde(tag = "type")]` gives internally tagged JSON:
/// `{ "type": "Mark", "room_id": 4, "slot": "player2", "position": 12 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Open a new room and take slot 1 in it.
    CreateRoom {
        player_name: String,
        #[serde(default)]
        player_avatar: Option<String>,
        /// Seats in the room. Defaults to 2.
        #[serde(default)]
        max_players: Option<u8>,
    },

    /// Take the next free seat in the room with this code.
    JoinRoom {
        room_code: String,
        player_name: String,
        #[serde(default)]
        player_avatar: Option<String>,
    },

    /// Submit (or resubmit) a card. Values are signed so negatives reach
    /// the validator and get a proper out-of-range error.
    ConfigureBoard {
        room_id: RoomId,
        slot: PlayerSlot,
        board: Vec<i64>,
    },

    /// Ask for a random valid card for this room's grid.
    SuggestBoard { room_id: RoomId },

    /// Announce the number at `position` on the caller's card.
    Mark {
        room_id: RoomId,
        slot: PlayerSlot,
        position: usize,
    },

    /// Start another game with the same players.
    Rematch {
        room_id: RoomId,
        reconfigure_board: bool,
    },

    /// Leave the room for good.
    ExitRoom { room_id: RoomId, slot: PlayerSlot },

    /// Look a room up by its share code.
    GetRoom { room_code: String },

    /// List a room's players in join order.
    GetPlayers { room_id: RoomId },

    /// Start receiving [`RoomEvent`]s for a room.
    Subscribe { room_id: RoomId },

    /// Stop receiving events for a room.
    Unsubscribe { room_id: RoomId },

    /// Keep-alive.
    Ping,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Machine-readable error category carried by [`ServerResponse::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidLength,
    OutOfRange,
    Duplicate,
    WrongTurn,
    GameNotActive,
    AlreadyMarked,
    InvalidPosition,
    BoardLocked,
    RoomFull,
    GameAlreadyStarted,
    InvalidRequest,
    CodeGenerationFailed,
    Internal,
}

/// Server → Client answer to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerResponse {
    RoomCreated { room: Room, player: Player },
    RoomJoined { room: Room, player: Player },
    BoardConfigured { room: Room },
    SuggestedBoard { board: Vec<u32> },
    /// Result of a mark. `number` is the value that was announced.
    Marked {
        number: u32,
        won: bool,
        winner: Option<PlayerSlot>,
    },
    RematchStarted { room: Room },
    /// `room_closed` is `true` when the leaver was the last player.
    Exited { room_closed: bool },
    RoomFound { room: Room },
    Players { players: Vec<Player> },
    Subscribed { room_id: RoomId },
    Unsubscribed { room_id: RoomId },
    Pong,
    /// `code` follows HTTP conventions (400, 404, 409, 500).
    Error {
        code: u16,
        kind: ErrorKind,
        message: String,
    },
}

/// A response tied to the request it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// The `seq` of the request envelope; 0 if the request was unreadable.
    pub request_seq: u64,
    pub response: ServerResponse,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Pushed to subscribers whenever a room or one of its players changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    RoomUpdated { room: Room },
    PlayerUpdated { player: Player },
    PlayerLeft { room_id: RoomId, slot: PlayerSlot },
    /// The active player ran out of time and the turn moved on.
    TurnTimedOut {
        room_id: RoomId,
        from: PlayerSlot,
        to: PlayerSlot,
    },
    RoomClosed { room_id: RoomId },
}

impl RoomEvent {
    /// The room this event belongs to.
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::RoomUpdated { room } => room.id,
            Self::PlayerUpdated { player } => player.room_id,
            Self::PlayerLeft { room_id, .. }
            | Self::TurnTimedOut { room_id, .. }
            | Self::RoomClosed { room_id } => *room_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged: `{ "type": "Request", "data": { "type": "Ping" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    Request(ClientRequest),
    Reply(Reply),
    Event(RoomEvent),
}

/// The top-level frame. Every message on the wire is an `Envelope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender counter. Replies echo the request's value in
    /// [`Reply::request_seq`].
    pub seq: u64,
    /// Milliseconds since the sender started.
    #[serde(default)]
    pub timestamp: u64,
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_request_json_shape() {
        let req = ClientRequest::Mark {
            room_id: RoomId(4),
            slot: PlayerSlot::new(2).unwrap(),
            position: 12,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "Mark");
        assert_eq!(json["room_id"], 4);
        assert_eq!(json["slot"], "player2");
        assert_eq!(json["position"], 12);
    }

    #[test]
    fn test_create_room_optional_fields_default() {
        let req: ClientRequest =
            serde_json::from_str(r#"{"type":"CreateRoom","player_name":"Ada"}"#)
                .unwrap();
        assert_eq!(
            req,
            ClientRequest::CreateRoom {
                player_name: "Ada".into(),
                player_avatar: None,
                max_players: None,
            }
        );
    }

    #[test]
    fn test_configure_board_rejects_fractional_values() {
        let raw = r#"{"type":"ConfigureBoard","room_id":1,"slot":"player1","board":[1.5]}"#;
        assert!(serde_json::from_str::<ClientRequest>(raw).is_err());
    }

    #[test]
    fn test_envelope_adjacent_tagging() {
        let env = Envelope {
            seq: 7,
            timestamp: 0,
            payload: Payload::Request(ClientRequest::Ping),
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["seq"], 7);
        assert_eq!(json["payload"]["type"], "Request");
        assert_eq!(json["payload"]["data"]["type"], "Ping");
    }

    #[test]
    fn test_error_reply_json_shape() {
        let reply = Reply {
            request_seq: 3,
            response: ServerResponse::Error {
                code: 409,
                kind: ErrorKind::WrongTurn,
                message: "not your turn".into(),
            },
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["request_seq"], 3);
        assert_eq!(json["response"]["type"], "Error");
        assert_eq!(json["response"]["kind"], "WrongTurn");
    }

    #[test]
    fn test_event_room_id() {
        let event = RoomEvent::TurnTimedOut {
            room_id: RoomId(9),
            from: PlayerSlot::FIRST,
            to: PlayerSlot::new(2).unwrap(),
        };
        assert_eq!(event.room_id(), RoomId(9));
    }
}
