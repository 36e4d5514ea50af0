//! Error types for the room layer.
//!
//! None of these are fatal. Inside the engine they describe why a command
//! was ignored and end up in a `debug` log line; only
//! [`RoomError::Unavailable`] reaches callers of the engine handle.

use playhub_protocol::{GameKind, Phase, ProtocolError, RoomId, UserId};

/// Errors that can occur while routing a command through the engine.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The engine task has stopped and its command channel is closed.
    #[error("session engine is unavailable")]
    Unavailable,

    /// The inbound message could not be turned into a command.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The game module refused the move.
    #[error("move rejected: {0}")]
    Rejected(#[from] MoveRejection),

    /// The command came from a connection that was replaced or closed.
    #[error("stale connection for {0}")]
    StaleConnection(UserId),

    /// The user is not seated in any room.
    #[error("{0} is not in a room")]
    NotSeated(UserId),

    /// The user tried to queue while already seated.
    #[error("{0} is already in room {1}")]
    AlreadySeated(UserId, RoomId),

    /// A room-scoped message carried another game's prefix.
    #[error("room {room} plays {expected}, message was for {got}")]
    WrongGame {
        room: RoomId,
        expected: GameKind,
        got: GameKind,
    },

    /// `game:leave` named a room the user is not seated in.
    #[error("user claimed room {claimed} but is seated in {actual}")]
    RoomMismatch { claimed: RoomId, actual: RoomId },

    /// The room's phase doesn't allow this command.
    #[error("room {0} is in phase {1}")]
    WrongPhase(RoomId, Phase),

    /// The engine was handed a configuration it cannot play.
    #[error("invalid engine config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Why an [`EngineConfig`](crate::EngineConfig) was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} board size must be at least 1")]
    EmptyBoard(GameKind),

    #[error("caro win length {win_length} must be between 1 and the board size {board_size}")]
    WinLength { win_length: usize, board_size: usize },

    #[error("ship class {name} of size {size} does not fit a board of size {board_size}")]
    ShipClass {
        name: String,
        size: usize,
        board_size: usize,
    },
}

/// Why a game module refused a move. The state is untouched in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    /// The input belongs to the other game variant.
    #[error("input does not belong to this game")]
    WrongGame,

    /// The actor is not one of the two players.
    #[error("actor is not a player")]
    NotAPlayer,

    /// The current phase doesn't accept this input.
    #[error("phase {0} does not accept this input")]
    WrongPhase(Phase),

    /// It is the other player's turn.
    #[error("not this player's turn")]
    NotYourTurn,

    /// The target index is off the board.
    #[error("cell {0} is out of bounds")]
    OutOfBounds(usize),

    /// Caro: the cell already holds a mark.
    #[error("cell {0} is occupied")]
    CellOccupied(usize),

    /// Battleship: this cell was already fired at.
    #[error("cell {0} was already fired at")]
    AlreadyFired(usize),

    /// Battleship: the fleet was already submitted.
    #[error("fleet already submitted")]
    AlreadyReady,

    /// Battleship: the submitted fleet is malformed.
    #[error("invalid fleet: {0}")]
    InvalidFleet(#[from] FleetError),
}

/// Why a battleship fleet failed placement validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FleetError {
    #[error("fleet is empty")]
    Empty,

    #[error("ship {0} has no cells")]
    EmptyShip(String),

    #[error("ship id {0} is used twice")]
    DuplicateId(String),

    #[error("ship {id} has cell {cell} outside the board")]
    OutOfBounds { id: String, cell: usize },

    #[error("cell {0} is covered by more than one ship")]
    Overlap(usize),

    #[error("ship {0} is not a straight contiguous line")]
    NotStraight(String),
}
