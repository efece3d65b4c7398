use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    cards::DealError,
    entities::{Chips, PlayerId, SessionStatus},
};

/// Rejections caused by the caller. The session is left unchanged.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("insufficient balance: need ${required}, have ${available}")]
    InsufficientBalance { required: Chips, available: Chips },
    #[error("bet must be at least ${min_bet}")]
    BelowMinimumBet { min_bet: Chips },
    #[error("bet amount must be positive")]
    InvalidAmount,
    #[error("can't check, ${to_call} to call")]
    CannotCheck { to_call: Chips },
    #[error("room is full")]
    RoomFull,
    #[error("game already in progress")]
    GameAlreadyInProgress,
    #[error("no actions allowed while the room is {status}")]
    NoActionsAllowed { status: SessionStatus },
    #[error("only the host can start the game")]
    NotHost,
    #[error("need {min}+ players")]
    NotEnoughPlayers { min: usize },
    #[error("not in this room")]
    NotInRoom,
    #[error("player has left the room")]
    AlreadyLeft,
    #[error("reconnect token doesn't match")]
    InvalidReconnectToken,
    #[error("seat is bound to another connection")]
    SeatTakenOver,
    #[error("name must be 1-{max} characters")]
    InvalidName { max: usize },
    #[error("message can't be empty")]
    EmptyChatMessage,
    #[error("message longer than {max} characters")]
    ChatMessageTooLong { max: usize },
    #[error("already in a room")]
    AlreadyInRoom,
    #[error("no rooms available")]
    NoRoomsAvailable,
}

/// Structural inconsistencies. Never expected to happen; the session is
/// refunded and reset when one is detected.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum InvariantError {
    #[error("invalid session state: turn order doesn't match the dealt players")]
    TurnOrderMismatch,
    #[error("invalid session state: {0} is in the turn order twice")]
    DuplicateTurn(PlayerId),
    #[error("invalid session state: no active player while betting")]
    MissingActivePlayer,
    #[error("invalid session state: active player {0} can't act")]
    InactiveTurn(PlayerId),
    #[error("invalid session state: active player outside of betting")]
    UnexpectedActivePlayer,
    #[error("invalid session state: {0} bet more this round than the whole hand")]
    RoundBetExceedsContribution(PlayerId),
    #[error("invalid session state: {0} holds chips in the pot outside of a hand")]
    StrayContribution(PlayerId),
    #[error("invalid session state: {0}")]
    Deal(#[from] DealError),
}

/// Anything a session transition can fail with.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}
