//! Error types for the engine.

use bingohall_grid::BoardError;
use bingohall_protocol::{
    ErrorKind, PlayerSlot, ProtocolError, RoomCode, RoomId, RoomStatus,
};
use bingohall_store::StoreError;

/// Errors returned by [`GameEngine`](crate::GameEngine) operations.
///
/// None of these are retried by the engine. State errors (`WrongTurn`,
/// `GameNotActive`, `AlreadyMarked`, ...) mean the caller's view of the
/// room is out of date.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("no room with code {0}")]
    RoomCodeNotFound(RoomCode),

    #[error("no {1} in room {0}")]
    PlayerNotFound(RoomId, PlayerSlot),

    /// The submitted card failed validation.
    #[error(transparent)]
    InvalidBoard(#[from] BoardError),

    #[error("it is not {actual}'s turn")]
    WrongTurn {
        expected: Option<PlayerSlot>,
        actual: PlayerSlot,
    },

    #[error("game is not active (room is {0})")]
    GameNotActive(RoomStatus),

    #[error("position {0} is already marked")]
    AlreadyMarked(usize),

    #[error("position {position} is outside a card of {len} cells")]
    InvalidPosition { position: usize, len: usize },

    /// Cards can only change while the room is waiting.
    #[error("cards are locked while the room is {0}")]
    BoardLocked(RoomStatus),

    #[error("room {room_id} is full ({max} players)")]
    RoomFull { room_id: RoomId, max: u8 },

    #[error("game in room {0} has already started")]
    GameAlreadyStarted(RoomId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("could not find a free room code after {0} attempts")]
    CodeGenerationFailed(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ProtocolError> for EngineError {
    fn from(err: ProtocolError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl EngineError {
    /// The wire category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_)
            | Self::RoomCodeNotFound(_)
            | Self::PlayerNotFound(..) => ErrorKind::NotFound,
            Self::InvalidBoard(BoardError::InvalidLength { .. }) => {
                ErrorKind::InvalidLength
            }
            Self::InvalidBoard(BoardError::OutOfRange { .. }) => {
                ErrorKind::OutOfRange
            }
            Self::InvalidBoard(BoardError::Duplicate { .. }) => {
                ErrorKind::Duplicate
            }
            Self::WrongTurn { .. } => ErrorKind::WrongTurn,
            Self::GameNotActive(_) => ErrorKind::GameNotActive,
            Self::AlreadyMarked(_) => ErrorKind::AlreadyMarked,
            Self::InvalidPosition { .. } => ErrorKind::InvalidPosition,
            Self::BoardLocked(_) => ErrorKind::BoardLocked,
            Self::RoomFull { .. } => ErrorKind::RoomFull,
            Self::GameAlreadyStarted(_) => ErrorKind::GameAlreadyStarted,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::CodeGenerationFailed(_) => ErrorKind::CodeGenerationFailed,
            // A row vanished between our read and our write.
            Self::Store(
                StoreError::RoomNotFound(_) | StoreError::PlayerNotFound(_),
            ) => ErrorKind::NotFound,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code for this error.
    pub fn code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidLength
            | ErrorKind::OutOfRange
            | ErrorKind::Duplicate
            | ErrorKind::InvalidPosition
            | ErrorKind::InvalidRequest => 400,
            ErrorKind::WrongTurn
            | ErrorKind::GameNotActive
            | ErrorKind::AlreadyMarked
            | ErrorKind::BoardLocked
            | ErrorKind::RoomFull
            | ErrorKind::GameAlreadyStarted => 409,
            ErrorKind::CodeGenerationFailed | ErrorKind::Internal => 500,
        }
    }
}
