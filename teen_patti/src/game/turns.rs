//! Turn order and betting round progression.

use log::{debug, info};

use super::{
    entities::{FoldReason, PlayerId, PlayerStatus, SessionStatus},
    events::SessionEvent,
    session::Session,
};

impl Session {
    /// Whether the player at `idx` in the turn order still owes an action
    /// this betting round. Players who acted but sit under the bet to call
    /// are asked again.
    fn needs_action(&self, idx: usize) -> bool {
        self.turn_order
            .get(idx)
            .and_then(|id| self.player(*id))
            .is_some_and(|p| p.can_act() && (!p.acted || p.round_bet < self.current_bet))
    }

    /// Players still in the hand with chips behind.
    fn actionable_count(&self) -> usize {
        self.players.iter().filter(|p| p.can_act()).count()
    }

    /// Start a betting round from the first seat.
    pub(super) fn open_betting(&mut self) -> Vec<SessionEvent> {
        self.active = None;
        if self.non_folded_count() > 1 && self.actionable_count() < 2 {
            debug!("room {}: nobody left to bet against", self.id);
            return self.showdown();
        }
        self.advance_turn()
    }

    /// Move the turn to the next seat that owes an action, wrapping around.
    /// Settles or completes the round when there's none.
    pub(super) fn advance_turn(&mut self) -> Vec<SessionEvent> {
        if self.non_folded_count() <= 1 {
            return self.settle();
        }

        let n = self.turn_order.len();
        let start = self.active.unwrap_or(n - 1);
        for step in 1..=n {
            let idx = (start + step) % n;
            if self.needs_action(idx) {
                return self.activate(idx);
            }
        }
        self.complete_betting_round()
    }

    fn activate(&mut self, idx: usize) -> Vec<SessionEvent> {
        self.active = Some(idx);
        self.turn_seq += 1;

        let id = self.turn_order[idx];
        let (name, round_bet) = self
            .player(id)
            .map(|p| (p.name.clone(), p.round_bet))
            .unwrap_or_default();
        vec![SessionEvent::TurnUpdate {
            active_player: id,
            player_name: name,
            betting_round: self.betting_round,
            current_bet: self.current_bet,
            to_call: self.current_bet.saturating_sub(round_bet),
            turn: self.turn_seq,
            timeout_secs: self.config.turn_timeout_secs,
        }]
    }

    fn complete_betting_round(&mut self) -> Vec<SessionEvent> {
        self.active = None;
        let mut events = vec![SessionEvent::BettingRoundEnded {
            betting_round: self.betting_round,
            pot: self.pot(),
        }];

        if self.betting_round >= self.config.max_betting_rounds || self.actionable_count() < 2 {
            events.extend(self.showdown());
            return events;
        }

        self.betting_round += 1;
        self.current_bet = 0;
        for player in self.players.iter_mut().filter(|p| p.in_hand()) {
            player.acted = false;
            player.round_bet = 0;
        }
        debug!(
            "room {}: betting round {} opened",
            self.id, self.betting_round
        );
        events.extend(self.open_betting());
        events
    }

    /// Fold a player for any reason, moving the turn on when it was theirs.
    pub(super) fn fold_player(&mut self, id: PlayerId, reason: FoldReason) -> Vec<SessionEvent> {
        let was_active = self.active_player() == Some(id);
        let Some(player) = self.player_mut(id) else {
            return vec![];
        };
        player.folded = true;
        player.acted = true;
        player.status = match reason {
            FoldReason::Voluntary => PlayerStatus::Folded,
            FoldReason::Timeout => PlayerStatus::TimedOut,
            FoldReason::Disconnected => PlayerStatus::Disconnected,
            FoldReason::Left => PlayerStatus::Left,
        };

        let mut events = vec![SessionEvent::PlayerFolded {
            player: self.player_ref(id),
            reason,
        }];
        if was_active || self.non_folded_count() <= 1 {
            events.extend(self.advance_turn());
        }
        events
    }

    /// The countdown for `turn` ran out. Force-folds the active player
    /// unless that turn is already over.
    pub fn expire_turn(&mut self, turn: u64) -> Vec<SessionEvent> {
        if self.status != SessionStatus::Betting || turn != self.turn_seq {
            debug!("room {}: ignoring stale expiry for turn {turn}", self.id);
            return vec![];
        }
        let Some(id) = self.active_player() else {
            return vec![];
        };
        info!(
            "room {}: {} ran out of time",
            self.id,
            self.player_ref(id).name
        );
        self.fold_player(id, FoldReason::Timeout)
    }
}
