use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{
    cards::{Card, HAND_SIZE},
    hand::{HandEvaluation, HandRank},
};

/// Type alias for whole chips. Balances and bets are never negative.
pub type Chips = u32;

/// Length of generated room identifiers.
pub const ROOM_ID_LENGTH: usize = 6;

/// Longest display name a player can pick.
pub const MAX_NAME_LENGTH: usize = 32;

const ROOM_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Stable player identity. Survives reconnects.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PlayerId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Transient reference to the connection a player is currently bound to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Secret handed only to the connection holding a seat. Required to rebind
/// the seat after a reconnect; rotated every time it is used.
#[derive(Clone, Copy, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReconnectToken(Uuid);

impl ReconnectToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReconnectToken {
    fn default() -> Self {
        Self::new()
    }
}

// Kept out of logs.
impl fmt::Debug for ReconnectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReconnectToken(..)")
    }
}

/// Short uppercase alphanumeric room identifier, e.g. `K3X9QZ`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let id = (0..ROOM_ID_LENGTH)
            .map(|_| ROOM_ID_CHARSET[rng.random_range(0..ROOM_ID_CHARSET.len())] as char)
            .collect();
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_ascii_uppercase())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Waiting,
    Dealing,
    Betting,
    Showdown,
    Settling,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Dealing => "dealing",
            Self::Betting => "betting",
            Self::Showdown => "showdown",
            Self::Settling => "settling",
        };
        write!(f, "{repr}")
    }
}

/// For players in a room. The display string is only a projection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    // In the room, no hand dealt yet.
    #[default]
    Waiting,
    // Posted the boot when the hand was dealt.
    Blind,
    // Dealt in and waiting for their move.
    Playing,
    Bet,
    Checked,
    Folded,
    // Forced to fold by the turn countdown.
    TimedOut,
    // Showed their hand.
    Showing,
    Disconnected,
    Left,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "Waiting",
            Self::Blind => "Blind",
            Self::Playing => "Playing",
            Self::Bet => "Bet",
            Self::Checked => "Checked",
            Self::Folded => "Folded",
            Self::TimedOut => "Folded (Timeout)",
            Self::Showing => "Showing",
            Self::Disconnected => "Disconnected",
            Self::Left => "Left",
        };
        write!(f, "{repr}")
    }
}

/// Why a player stopped playing a hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldReason {
    Voluntary,
    Timeout,
    Disconnected,
    Left,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub id: PlayerId,
    /// `None` while the player is disconnected or has left.
    pub connection: Option<ConnectionId>,
    /// Only ever sent to the player's own connection.
    pub token: ReconnectToken,
    pub name: String,
    pub balance: Chips,
    pub hand: Option<[Card; HAND_SIZE]>,
    pub folded: bool,
    pub acted: bool,
    /// Chips put into the pot during the current hand.
    pub contribution: Chips,
    /// Chips put in during the current betting round.
    pub round_bet: Chips,
    pub revealed: Option<HandEvaluation>,
    pub status: PlayerStatus,
    /// Explicitly left. Can't rejoin.
    pub left: bool,
}

impl Player {
    #[must_use]
    pub fn new(name: String, balance: Chips, connection: ConnectionId) -> Self {
        Self {
            id: PlayerId::new(),
            connection: Some(connection),
            token: ReconnectToken::new(),
            name,
            balance,
            hand: None,
            folded: false,
            acted: false,
            contribution: 0,
            round_bet: 0,
            revealed: None,
            status: PlayerStatus::Waiting,
            left: false,
        }
    }

    /// Dealt in, still in the hand, and has chips to act with.
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.hand.is_some() && !self.folded && self.balance > 0
    }

    #[must_use]
    pub fn in_hand(&self) -> bool {
        self.hand.is_some() && !self.folded
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Evaluate the current hand. Never cached across hands.
    #[must_use]
    pub fn evaluate(&self) -> Option<HandEvaluation> {
        self.hand.as_ref().map(super::hand::evaluate)
    }

    /// Clear per-hand state, keeping identity and balance.
    pub fn reset(&mut self) {
        self.hand = None;
        self.folded = false;
        self.acted = false;
        self.contribution = 0;
        self.round_bet = 0;
        self.revealed = None;
        self.status = PlayerStatus::Waiting;
    }
}

/// Public summary of a shown hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HandView {
    pub rank: HandRank,
    pub description: String,
    pub score: u32,
}

impl From<HandEvaluation> for HandView {
    fn from(value: HandEvaluation) -> Self {
        Self {
            rank: value.rank,
            description: value.description(),
            score: value.score(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub balance: Chips,
    /// Only present for the viewer's own hand or shown hands.
    pub cards: Option<Vec<Card>>,
    pub has_cards: bool,
    pub folded: bool,
    pub acted: bool,
    pub contribution: Chips,
    pub round_bet: Chips,
    pub status: PlayerStatus,
    pub status_label: String,
    pub hand: Option<HandView>,
    pub connected: bool,
    pub is_host: bool,
}

/// A room as seen by one viewer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomView {
    pub room_id: RoomId,
    pub status: SessionStatus,
    pub round: u32,
    pub betting_round: u8,
    pub pot: Chips,
    pub min_bet: Chips,
    pub current_bet: Chips,
    pub turn_order: Vec<PlayerId>,
    pub active_player: Option<PlayerId>,
    pub host: Option<PlayerId>,
    pub players: Vec<PlayerView>,
}

/// Directory-level summary used for matchmaking and listings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub status: SessionStatus,
    pub player_count: usize,
    pub max_players: usize,
    pub round: u32,
    pub pot: Chips,
}

impl RoomSummary {
    /// Open for new players.
    #[must_use]
    pub fn is_joinable(&self) -> bool {
        self.status == SessionStatus::Waiting && self.player_count < self.max_players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_room_id_generation() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = RoomId::generate(&mut rng);
        assert_eq!(id.as_str().len(), ROOM_ID_LENGTH);
        assert!(
            id.as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_room_id_normalizes_input() {
        assert_eq!(RoomId::from(" ab12cd "), RoomId::from("AB12CD"));
    }

    #[test]
    fn test_room_id_deserialize_normalizes() {
        let id: RoomId = serde_json::from_str("\"k3x9qz\"").unwrap();
        assert_eq!(id.as_str(), "K3X9QZ");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"K3X9QZ\"");
    }

    #[test]
    fn test_reconnect_token_is_not_logged() {
        let player = Player::new("alice".to_string(), 100, ConnectionId::new());
        let debug = format!("{player:?}");
        let secret = serde_json::to_string(&player.token).unwrap();
        assert!(!debug.contains(secret.trim_matches('"')));
        assert_ne!(player.token, ReconnectToken::new());
    }

    #[test]
    fn test_player_status_display() {
        assert_eq!(PlayerStatus::TimedOut.to_string(), "Folded (Timeout)");
        assert_eq!(PlayerStatus::Blind.to_string(), "Blind");
        assert_eq!(SessionStatus::Showdown.to_string(), "showdown");
    }

    #[test]
    fn test_player_reset_keeps_balance() {
        let mut player = Player::new("alice".to_string(), 500, ConnectionId::new());
        player.hand = Some(["2♠".parse().unwrap(), "3♠".parse().unwrap(), "4♠".parse().unwrap()]);
        player.folded = true;
        player.acted = true;
        player.contribution = 40;
        player.round_bet = 20;
        player.status = PlayerStatus::Folded;

        player.reset();

        assert_eq!(player.balance, 500);
        assert!(player.hand.is_none());
        assert!(!player.folded);
        assert!(!player.acted);
        assert_eq!(player.contribution, 0);
        assert_eq!(player.round_bet, 0);
        assert_eq!(player.status, PlayerStatus::Waiting);
    }

    #[test]
    fn test_can_act() {
        let mut player = Player::new("bob".to_string(), 100, ConnectionId::new());
        assert!(!player.can_act());
        player.hand = Some(["2♠".parse().unwrap(), "3♠".parse().unwrap(), "4♠".parse().unwrap()]);
        assert!(player.can_act());
        player.balance = 0;
        assert!(!player.can_act());
        assert!(player.in_hand());
        player.folded = true;
        assert!(!player.in_hand());
    }

    #[test]
    fn test_summary_joinable() {
        let mut summary = RoomSummary {
            room_id: RoomId::from("ABCDEF"),
            status: SessionStatus::Waiting,
            player_count: 4,
            max_players: 5,
            round: 1,
            pot: 0,
        };
        assert!(summary.is_joinable());
        summary.player_count = 5;
        assert!(!summary.is_joinable());
        summary.player_count = 1;
        summary.status = SessionStatus::Betting;
        assert!(!summary.is_joinable());
    }
}
