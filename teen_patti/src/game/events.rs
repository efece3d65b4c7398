use serde::{Deserialize, Serialize};

use super::{
    cards::Card,
    entities::{Chips, FoldReason, HandView, PlayerId},
};

/// A player as announced to the room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerBalance {
    pub id: PlayerId,
    pub name: String,
    pub balance: Chips,
}

/// A hand shown to the whole room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Reveal {
    pub player_id: PlayerId,
    pub player_name: String,
    pub cards: Vec<Card>,
    pub hand: HandView,
}

/// Notifications produced by session transitions. Every event is broadcast
/// to the whole room.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    PlayerJoined {
        player: PlayerBalance,
        player_count: usize,
    },
    PlayerReconnected {
        player: PlayerRef,
    },
    PlayerDisconnected {
        player: PlayerRef,
    },
    PlayerLeft {
        player: PlayerRef,
        host: Option<PlayerId>,
        player_count: usize,
    },
    GameStarted {
        round: u32,
        turn_order: Vec<PlayerId>,
        boot: Chips,
        pot: Chips,
        min_bet: Chips,
    },
    TurnUpdate {
        active_player: PlayerId,
        player_name: String,
        betting_round: u8,
        current_bet: Chips,
        to_call: Chips,
        turn: u64,
        timeout_secs: u64,
    },
    BetPlaced {
        player: PlayerRef,
        amount: Chips,
        raised: bool,
        all_in: bool,
        pot: Chips,
        current_bet: Chips,
        balance: Chips,
    },
    PlayerChecked {
        player: PlayerRef,
    },
    PlayerFolded {
        player: PlayerRef,
        reason: FoldReason,
    },
    BettingRoundEnded {
        betting_round: u8,
        pot: Chips,
    },
    Showdown {
        reveals: Vec<Reveal>,
    },
    WinnerDeclared {
        winner: PlayerRef,
        pot: Chips,
        hand: Option<HandView>,
        by_fold: bool,
    },
    TieGame {
        winners: Vec<PlayerRef>,
        pot: Chips,
        share: Chips,
        remainder: Chips,
        hand: HandView,
    },
    PotRefunded {
        contributors: Vec<PlayerRef>,
        pot: Chips,
        share: Chips,
        remainder: Chips,
    },
    RoundEnded {
        next_round: u32,
        balances: Vec<PlayerBalance>,
    },
    ChatMessage {
        player: PlayerRef,
        text: String,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
    },
}

impl SessionEvent {
    /// The countdown tied to this turn, when the event starts one.
    #[must_use]
    pub fn turn(&self) -> Option<u64> {
        match self {
            Self::TurnUpdate { turn, .. } => Some(*turn),
            _ => None,
        }
    }

    /// Whether this event finishes a hand.
    #[must_use]
    pub fn is_settlement(&self) -> bool {
        matches!(
            self,
            Self::WinnerDeclared { .. } | Self::TieGame { .. } | Self::PotRefunded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_tag() {
        let event = SessionEvent::PlayerChecked {
            player: PlayerRef {
                id: PlayerId::new(),
                name: "alice".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player_checked");
        assert_eq!(json["player"]["name"], "alice");
    }

    #[test]
    fn test_fold_reason_wire_name() {
        let json = serde_json::to_value(FoldReason::Timeout).unwrap();
        assert_eq!(json, "timeout");
    }
}
