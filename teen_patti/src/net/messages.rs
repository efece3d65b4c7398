use serde::{Deserialize, Serialize};

use crate::game::{
    entities::{Chips, PlayerId, ReconnectToken, RoomId, RoomView},
    events::SessionEvent,
};

/// Intents sent by a client.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        player_name: String,
        #[serde(default)]
        balance: Option<Chips>,
    },
    JoinRoom {
        room_id: RoomId,
        player_name: String,
        #[serde(default)]
        balance: Option<Chips>,
    },
    /// Join any open room, creating one when none has a free seat.
    QuickJoin {
        player_name: String,
        #[serde(default)]
        balance: Option<Chips>,
    },
    /// Resume a seat after the previous connection dropped.
    Rejoin {
        room_id: RoomId,
        player_id: PlayerId,
        token: ReconnectToken,
    },
    StartGame {
        room_id: RoomId,
    },
    PlaceBet {
        room_id: RoomId,
        amount: Chips,
    },
    Check {
        room_id: RoomId,
    },
    Fold {
        room_id: RoomId,
    },
    Reveal {
        room_id: RoomId,
    },
    ChatMessage {
        room_id: RoomId,
        text: String,
    },
    LeaveRoom {
        room_id: RoomId,
    },
}

impl ClientMessage {
    /// The room the intent targets, for intents inside a room.
    #[must_use]
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::CreateRoom { .. } | Self::QuickJoin { .. } => None,
            Self::JoinRoom { room_id, .. }
            | Self::Rejoin { room_id, .. }
            | Self::StartGame { room_id }
            | Self::PlaceBet { room_id, .. }
            | Self::Check { room_id }
            | Self::Fold { room_id }
            | Self::Reveal { room_id }
            | Self::ChatMessage { room_id, .. }
            | Self::LeaveRoom { room_id } => Some(room_id),
        }
    }
}

/// Notifications sent to a client.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent only to the room's creator.
    RoomCreated {
        room_id: RoomId,
        player_id: PlayerId,
        token: ReconnectToken,
        state: RoomView,
    },
    /// Sent only to the joining player.
    RoomJoined {
        room_id: RoomId,
        player_id: PlayerId,
        token: ReconnectToken,
        state: RoomView,
    },
    /// Sent only to the player that rejoined. The token it carries replaces
    /// the previous one.
    Reconnected {
        room_id: RoomId,
        player_id: PlayerId,
        token: ReconnectToken,
        state: RoomView,
    },
    /// Personalised full state, sent after every accepted intent.
    GameState {
        state: RoomView,
    },
    /// Rejection of the recipient's own intent.
    Error {
        message: String,
    },
    #[serde(untagged)]
    Event(SessionEvent),
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}

impl From<SessionEvent> for ServerMessage {
    fn from(value: SessionEvent) -> Self {
        Self::Event(value)
    }
}
