//! Room actor message types.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::game::{
    entities::{Chips, ConnectionId, PlayerId, ReconnectToken, RoomId, RoomView},
    errors::{InvariantError, UserError},
};
use crate::net::messages::ServerMessage;

/// Per-connection notification channel. Sends never block the room.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Response from room operations
pub type RoomResponse<T> = Result<T, RoomError>;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),
    #[error("room is closed")]
    RoomClosed,
    #[error("room stopped responding")]
    ResponseDropped,
    #[error("invalid room config: {0}")]
    InvalidConfig(String),
    #[error("hand abandoned: {0}")]
    Invariant(#[from] InvariantError),
    #[error(transparent)]
    User(#[from] UserError),
}

/// A betting action by the active player.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayerAction {
    Bet(Chips),
    Check,
    Fold,
    Reveal,
}

/// Seat assignment returned to a joining or rejoining connection.
#[derive(Clone, Debug)]
pub struct Seat {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    /// Needed to reclaim the seat from another connection.
    pub token: ReconnectToken,
    pub state: RoomView,
}

/// Messages that can be sent to a RoomActor.
///
/// Messages acting for a seated player carry the sender's connection and are
/// rejected unless it is the one bound to that player.
#[derive(Debug)]
pub enum RoomMessage {
    /// Take a seat. `creator` marks the player that opened the room.
    Join {
        name: String,
        balance: Option<Chips>,
        connection: ConnectionId,
        outbox: Outbox,
        creator: bool,
        response: oneshot::Sender<RoomResponse<Seat>>,
    },

    /// Rebind an existing seat to a new connection
    Rejoin {
        player_id: PlayerId,
        token: ReconnectToken,
        connection: ConnectionId,
        outbox: Outbox,
        response: oneshot::Sender<RoomResponse<Seat>>,
    },

    /// Deal a new hand (host only)
    StartGame {
        player_id: PlayerId,
        connection: ConnectionId,
        response: oneshot::Sender<RoomResponse<()>>,
    },

    /// Bet, check, fold or reveal
    Action {
        player_id: PlayerId,
        connection: ConnectionId,
        action: PlayerAction,
        response: oneshot::Sender<RoomResponse<()>>,
    },

    /// Send chat message
    Chat {
        player_id: PlayerId,
        connection: ConnectionId,
        text: String,
        response: oneshot::Sender<RoomResponse<()>>,
    },

    /// Leave the room for good
    Leave {
        player_id: PlayerId,
        connection: ConnectionId,
        response: oneshot::Sender<RoomResponse<()>>,
    },

    /// The connection bound to a player closed. Replies once handled so the
    /// directory can drop empty rooms.
    Disconnect {
        player_id: PlayerId,
        connection: ConnectionId,
        response: oneshot::Sender<()>,
    },

    /// Get the room as seen by a viewer
    GetState {
        viewer: Option<PlayerId>,
        response: oneshot::Sender<RoomView>,
    },
}
