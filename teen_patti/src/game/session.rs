//! Per-room session state.
//!
//! A [`Session`] owns the roster, the fixed turn order of the hand in play,
//! and every per-player bet. It never blocks and never spawns; the room
//! actor drives it and owns the turn countdown. Transitions return the
//! [`SessionEvent`]s to broadcast, in order.
//!
//! Turn handling, betting and settlement live in sibling modules as further
//! `impl Session` blocks.

use chrono::Utc;
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use std::collections::HashSet;

use super::{
    cards::Deck,
    entities::{
        Chips, ConnectionId, FoldReason, MAX_NAME_LENGTH, Player, PlayerId, PlayerStatus,
        PlayerView, ReconnectToken, RoomId, RoomSummary, RoomView, SessionStatus,
    },
    errors::{InvariantError, SessionError, UserError},
    events::{PlayerBalance, PlayerRef, SessionEvent},
};
use crate::room::config::RoomConfig;

#[derive(Debug)]
pub struct Session {
    pub(super) id: RoomId,
    pub(super) config: RoomConfig,
    /// Join order. The first player still present is the host.
    pub(super) players: Vec<Player>,
    pub(super) status: SessionStatus,
    /// Fixed when the hand is dealt, cleared on reset.
    pub(super) turn_order: Vec<PlayerId>,
    /// Index into `turn_order`. Only set while betting.
    pub(super) active: Option<usize>,
    pub(super) min_bet: Chips,
    /// Round bet every player must match to stay in.
    pub(super) current_bet: Chips,
    pub(super) betting_round: u8,
    /// Hand counter, starting at 1.
    pub(super) round: u32,
    /// Bumped every time a turn starts. Countdowns carry it so an expiry
    /// for an earlier turn is ignored.
    pub(super) turn_seq: u64,
}

impl Session {
    #[must_use]
    pub fn new(id: RoomId, config: RoomConfig) -> Self {
        let min_bet = config.min_bet;
        Self {
            id,
            config,
            players: Vec::new(),
            status: SessionStatus::Waiting,
            turn_order: Vec::new(),
            active: None,
            min_bet,
            current_bet: 0,
            betting_round: 0,
            round: 1,
            turn_seq: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    #[must_use]
    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn betting_round(&self) -> u8 {
        self.betting_round
    }

    #[must_use]
    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    #[must_use]
    pub fn min_bet(&self) -> Chips {
        self.min_bet
    }

    #[must_use]
    pub fn turn_seq(&self) -> u64 {
        self.turn_seq
    }

    #[must_use]
    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The pot is always the sum of what players put in this hand.
    #[must_use]
    pub fn pot(&self) -> Chips {
        self.players.iter().map(|p| p.contribution).sum()
    }

    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(super) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    #[must_use]
    pub fn active_player(&self) -> Option<PlayerId> {
        self.active
            .and_then(|idx| self.turn_order.get(idx))
            .copied()
    }

    /// First player in join order who hasn't left or disconnected.
    #[must_use]
    pub fn host(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.is_connected()).map(|p| p.id)
    }

    /// Players still bound to a connection.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_connected()).count()
    }

    /// No players left at all, including departed seats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players
    }

    pub(super) fn non_folded_count(&self) -> usize {
        self.players.iter().filter(|p| p.in_hand()).count()
    }

    pub(super) fn player_ref(&self, id: PlayerId) -> PlayerRef {
        let name = self
            .player(id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        PlayerRef { id, name }
    }

    pub(super) fn balances(&self) -> Vec<PlayerBalance> {
        self.players
            .iter()
            .map(|p| PlayerBalance {
                id: p.id,
                name: p.name.clone(),
                balance: p.balance,
            })
            .collect()
    }

    /// Add a player to a waiting room. A missing or zero balance gets the
    /// configured starting stake.
    pub fn join(
        &mut self,
        name: &str,
        balance: Option<Chips>,
        connection: ConnectionId,
    ) -> Result<(PlayerId, Vec<SessionEvent>), UserError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
            return Err(UserError::InvalidName {
                max: MAX_NAME_LENGTH,
            });
        }
        if self.status != SessionStatus::Waiting {
            return Err(UserError::GameAlreadyInProgress);
        }
        if self.is_full() {
            return Err(UserError::RoomFull);
        }

        let balance = balance
            .filter(|balance| *balance > 0)
            .unwrap_or(self.config.starting_stake);
        let player = Player::new(name.to_string(), balance, connection);
        let id = player.id;
        info!("room {}: {name} joined with ${balance}", self.id);
        self.players.push(player);

        let event = SessionEvent::PlayerJoined {
            player: PlayerBalance {
                id,
                name: name.to_string(),
                balance,
            },
            player_count: self.present_count(),
        };
        Ok((id, vec![event]))
    }

    /// The secret the player needs to reclaim their seat later.
    #[must_use]
    pub fn reconnect_token(&self, id: PlayerId) -> Option<ReconnectToken> {
        self.player(id).map(|p| p.token)
    }

    /// Check that `connection` is the one currently bound to the player.
    pub fn authorize(&self, id: PlayerId, connection: ConnectionId) -> Result<(), UserError> {
        let player = self.player(id).ok_or(UserError::NotInRoom)?;
        match player.connection {
            Some(bound) if bound == connection => Ok(()),
            Some(_) => Err(UserError::SeatTakenOver),
            None if player.left => Err(UserError::AlreadyLeft),
            None => Err(UserError::NotInRoom),
        }
    }

    /// Bind a player to a new connection. Turn position, bets and fold state
    /// are untouched. The token is rotated, so each one works once; a
    /// connection still bound to the seat loses it.
    pub fn rejoin(
        &mut self,
        id: PlayerId,
        token: ReconnectToken,
        connection: ConnectionId,
    ) -> Result<Vec<SessionEvent>, UserError> {
        let room_id = self.id.clone();
        let player = self.player_mut(id).ok_or(UserError::NotInRoom)?;
        if player.left {
            return Err(UserError::AlreadyLeft);
        }
        if player.token != token {
            warn!("room {room_id}: rejected rejoin for {id} with a wrong token");
            return Err(UserError::InvalidReconnectToken);
        }

        if player.connection.is_some_and(|bound| bound != connection) {
            info!("room {room_id}: {} moved to a new connection", player.name);
        }
        player.connection = Some(connection);
        player.token = ReconnectToken::new();
        if player.status == PlayerStatus::Disconnected {
            player.status = if player.folded {
                PlayerStatus::Folded
            } else if player.hand.is_some() {
                PlayerStatus::Playing
            } else {
                PlayerStatus::Waiting
            };
        }
        info!("room {room_id}: {} reconnected", player.name);

        Ok(vec![SessionEvent::PlayerReconnected {
            player: self.player_ref(id),
        }])
    }

    /// Explicitly leave the room. Players in a hand fold and keep their seat
    /// until the hand is reset.
    pub fn leave(&mut self, id: PlayerId) -> Result<Vec<SessionEvent>, UserError> {
        let player = self.player(id).ok_or(UserError::NotInRoom)?;
        if player.left {
            return Err(UserError::AlreadyLeft);
        }
        Ok(self.depart(id, FoldReason::Left))
    }

    /// A connection closed. Ignored when the player has since been bound to
    /// another connection.
    pub fn disconnect(&mut self, id: PlayerId, connection: ConnectionId) -> Vec<SessionEvent> {
        match self.player(id) {
            Some(player) if player.connection == Some(connection) => {
                self.depart(id, FoldReason::Disconnected)
            }
            Some(_) => {
                debug!("room {}: ignoring stale disconnect for {id}", self.id);
                vec![]
            }
            None => vec![],
        }
    }

    fn depart(&mut self, id: PlayerId, reason: FoldReason) -> Vec<SessionEvent> {
        let player_ref = self.player_ref(id);

        if self.status == SessionStatus::Waiting {
            self.players.retain(|p| p.id != id);
            info!("room {}: {} left", self.id, player_ref.name);
            return vec![SessionEvent::PlayerLeft {
                player: player_ref,
                host: self.host(),
                player_count: self.present_count(),
            }];
        }

        let was_in_hand = self.status == SessionStatus::Betting
            && self.player(id).is_some_and(Player::in_hand);
        if let Some(player) = self.player_mut(id) {
            player.connection = None;
            player.left = reason == FoldReason::Left;
            player.status = if player.left {
                PlayerStatus::Left
            } else {
                PlayerStatus::Disconnected
            };
        }
        info!(
            "room {}: {} departed mid-hand ({reason:?})",
            self.id, player_ref.name
        );

        let mut events = vec![if reason == FoldReason::Left {
            SessionEvent::PlayerLeft {
                player: player_ref,
                host: self.host(),
                player_count: self.present_count(),
            }
        } else {
            SessionEvent::PlayerDisconnected { player: player_ref }
        }];
        if was_in_hand {
            events.extend(self.fold_player(id, reason));
        }
        events
    }

    /// Deal a new hand from a freshly shuffled deck.
    pub fn start_game(&mut self, caller: PlayerId) -> Result<Vec<SessionEvent>, SessionError> {
        self.start_game_with_deck(caller, Deck::shuffled())
    }

    /// Deal a new hand from `deck`, one hand per player in join order.
    pub fn start_game_with_deck(
        &mut self,
        caller: PlayerId,
        mut deck: Deck,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        if self.status != SessionStatus::Waiting {
            return Err(UserError::GameAlreadyInProgress.into());
        }
        if self.player(caller).is_none() {
            return Err(UserError::NotInRoom.into());
        }
        if self.host() != Some(caller) {
            return Err(UserError::NotHost.into());
        }
        if self.players.len() < self.config.min_players {
            return Err(UserError::NotEnoughPlayers {
                min: self.config.min_players,
            }
            .into());
        }

        self.status = SessionStatus::Dealing;
        let hands = match deck.deal(self.players.len()) {
            Ok(hands) => hands,
            Err(err) => {
                error!("room {}: failed to deal: {err}", self.id);
                self.status = SessionStatus::Waiting;
                return Err(InvariantError::from(err).into());
            }
        };

        let boot = self.config.boot_amount;
        for (player, hand) in self.players.iter_mut().zip(hands) {
            player.reset();
            player.hand = Some(hand);
            let posted = boot.min(player.balance);
            player.balance -= posted;
            player.contribution += posted;
            player.status = if posted > 0 {
                PlayerStatus::Blind
            } else {
                PlayerStatus::Playing
            };
        }

        self.turn_order = self.players.iter().map(|p| p.id).collect();
        if self.config.shuffle_turn_order {
            self.turn_order.shuffle(&mut rand::rng());
        }
        self.min_bet = self.config.min_bet;
        self.current_bet = 0;
        self.betting_round = 1;
        self.active = None;
        self.status = SessionStatus::Betting;
        info!(
            "room {}: hand {} dealt to {} players",
            self.id,
            self.round,
            self.turn_order.len()
        );

        let mut events = vec![SessionEvent::GameStarted {
            round: self.round,
            turn_order: self.turn_order.clone(),
            boot,
            pot: self.pot(),
            min_bet: self.min_bet,
        }];
        events.extend(self.open_betting());
        Ok(events)
    }

    pub fn chat(&self, id: PlayerId, text: &str) -> Result<Vec<SessionEvent>, UserError> {
        let player = self
            .player(id)
            .filter(|p| p.is_connected())
            .ok_or(UserError::NotInRoom)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(UserError::EmptyChatMessage);
        }
        if text.chars().count() > self.config.max_chat_length {
            return Err(UserError::ChatMessageTooLong {
                max: self.config.max_chat_length,
            });
        }

        Ok(vec![SessionEvent::ChatMessage {
            player: PlayerRef {
                id,
                name: player.name.clone(),
            },
            text: text.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }])
    }

    /// The room as seen by `viewer`. Other players' cards stay hidden until
    /// they're shown.
    #[must_use]
    pub fn view_for(&self, viewer: Option<PlayerId>) -> RoomView {
        let host = self.host();
        let players = self
            .players
            .iter()
            .map(|p| {
                let own = viewer == Some(p.id);
                let visible = own || p.revealed.is_some();
                let hand = p.revealed.or_else(|| own.then(|| p.evaluate()).flatten());
                PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    balance: p.balance,
                    cards: p.hand.filter(|_| visible).map(|hand| hand.to_vec()),
                    has_cards: p.hand.is_some(),
                    folded: p.folded,
                    acted: p.acted,
                    contribution: p.contribution,
                    round_bet: p.round_bet,
                    status: p.status,
                    status_label: p.status.to_string(),
                    hand: hand.map(Into::into),
                    connected: p.is_connected(),
                    is_host: host == Some(p.id),
                }
            })
            .collect();

        RoomView {
            room_id: self.id.clone(),
            status: self.status,
            round: self.round,
            betting_round: self.betting_round,
            pot: self.pot(),
            min_bet: self.min_bet,
            current_bet: self.current_bet,
            turn_order: self.turn_order.clone(),
            active_player: self.active_player(),
            host,
            players,
        }
    }

    #[must_use]
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            status: self.status,
            player_count: self.players.len(),
            max_players: self.config.max_players,
            round: self.round,
            pot: self.pot(),
        }
    }

    /// Check the structural invariants of the session.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.status == SessionStatus::Waiting {
            if !self.turn_order.is_empty() {
                return Err(InvariantError::TurnOrderMismatch);
            }
            if self.active.is_some() {
                return Err(InvariantError::UnexpectedActivePlayer);
            }
            if let Some(player) = self
                .players
                .iter()
                .find(|p| p.contribution > 0 || p.hand.is_some())
            {
                return Err(InvariantError::StrayContribution(player.id));
            }
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(self.turn_order.len());
        for id in &self.turn_order {
            if !seen.insert(*id) {
                return Err(InvariantError::DuplicateTurn(*id));
            }
            if self.player(*id).is_none_or(|p| p.hand.is_none()) {
                return Err(InvariantError::TurnOrderMismatch);
            }
        }
        let dealt = self.players.iter().filter(|p| p.hand.is_some()).count();
        if dealt != self.turn_order.len() {
            return Err(InvariantError::TurnOrderMismatch);
        }

        if let Some(player) = self.players.iter().find(|p| p.round_bet > p.contribution) {
            return Err(InvariantError::RoundBetExceedsContribution(player.id));
        }

        if self.status == SessionStatus::Betting {
            let id = self
                .active_player()
                .ok_or(InvariantError::MissingActivePlayer)?;
            if self.player(id).is_none_or(|p| !p.can_act()) {
                return Err(InvariantError::InactiveTurn(id));
            }
        } else if self.active.is_some() {
            return Err(InvariantError::UnexpectedActivePlayer);
        }

        Ok(())
    }
}
