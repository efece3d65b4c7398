//! Showdown, pot settlement and the reset between hands.

use log::{error, info};

use super::{
    entities::{Chips, Player, PlayerId, PlayerStatus, SessionStatus},
    errors::InvariantError,
    events::{PlayerRef, Reveal, SessionEvent},
    hand::{self, HandEvaluation},
    session::Session,
};

/// Even split of `pot` across `n` shares, plus what's left over.
fn split(pot: Chips, n: usize) -> (Chips, Chips) {
    let n = Chips::try_from(n).unwrap_or(Chips::MAX).max(1);
    (pot / n, pot % n)
}

impl Session {
    /// Reveal every hand still in and settle.
    pub(super) fn showdown(&mut self) -> Vec<SessionEvent> {
        self.status = SessionStatus::Showdown;
        self.active = None;

        let mut reveals = Vec::new();
        for id in self.turn_order.clone() {
            let Some(player) = self.player_mut(id).filter(|p| p.in_hand()) else {
                continue;
            };
            let (Some(cards), Some(hand)) = (player.hand, player.evaluate()) else {
                continue;
            };
            player.revealed = Some(hand);
            player.status = PlayerStatus::Showing;
            reveals.push(Reveal {
                player_id: id,
                player_name: player.name.clone(),
                cards: cards.to_vec(),
                hand: hand.into(),
            });
        }

        let mut events = vec![SessionEvent::Showdown { reveals }];
        events.extend(self.settle());
        events
    }

    /// Pay out the pot. With one player left there's no hand comparison.
    pub(super) fn settle(&mut self) -> Vec<SessionEvent> {
        self.status = SessionStatus::Settling;
        self.active = None;
        let pot = self.pot();

        let contenders: Vec<PlayerId> = self
            .turn_order
            .iter()
            .copied()
            .filter(|id| self.player(*id).is_some_and(Player::in_hand))
            .collect();

        match contenders.as_slice() {
            [] => self.refund(),
            [winner] => {
                let winner = *winner;
                self.clear_pot();
                self.credit(winner, pot);
                info!(
                    "room {}: {} wins ${pot} uncontested",
                    self.id,
                    self.player_ref(winner).name
                );
                vec![SessionEvent::WinnerDeclared {
                    winner: self.player_ref(winner),
                    pot,
                    hand: None,
                    by_fold: true,
                }]
            }
            _ => self.award_best_hands(&contenders, pot),
        }
    }

    fn award_best_hands(&mut self, contenders: &[PlayerId], pot: Chips) -> Vec<SessionEvent> {
        let evaluated: Vec<(PlayerId, HandEvaluation)> = contenders
            .iter()
            .filter_map(|id| {
                self.player(*id)
                    .and_then(Player::evaluate)
                    .map(|hand| (*id, hand))
            })
            .collect();
        let hands: Vec<HandEvaluation> = evaluated.iter().map(|(_, hand)| *hand).collect();
        let winners: Vec<PlayerId> = hand::winners(&hands)
            .into_iter()
            .map(|idx| evaluated[idx].0)
            .collect();

        let Some((&first, _)) = winners.split_first() else {
            return self.refund();
        };
        let best = hands.iter().max().copied();
        self.clear_pot();

        if winners.len() == 1 {
            self.credit(first, pot);
            info!(
                "room {}: {} wins ${pot} at showdown",
                self.id,
                self.player_ref(first).name
            );
            return vec![SessionEvent::WinnerDeclared {
                winner: self.player_ref(first),
                pot,
                hand: best.map(Into::into),
                by_fold: false,
            }];
        }

        // Winners are in turn order, so the first one picks up the remainder.
        let (share, remainder) = split(pot, winners.len());
        for id in &winners {
            self.credit(*id, share);
        }
        self.credit(first, remainder);
        info!(
            "room {}: ${pot} split {} ways (${share} each, ${remainder} left over)",
            self.id,
            winners.len()
        );

        let winners = winners.iter().map(|id| self.player_ref(*id)).collect();
        match best {
            Some(hand) => vec![SessionEvent::TieGame {
                winners,
                pot,
                share,
                remainder,
                hand: hand.into(),
            }],
            None => vec![],
        }
    }

    /// Give every contributor back an even share of the pot.
    fn refund(&mut self) -> Vec<SessionEvent> {
        let pot = self.pot();
        let mut contributors: Vec<&Player> =
            self.players.iter().filter(|p| p.contribution > 0).collect();
        contributors.sort_by_key(|p| {
            self.turn_order
                .iter()
                .position(|id| *id == p.id)
                .unwrap_or(usize::MAX)
        });
        let contributors: Vec<PlayerRef> = contributors
            .into_iter()
            .map(|p| PlayerRef {
                id: p.id,
                name: p.name.clone(),
            })
            .collect();

        self.clear_pot();
        let Some(first) = contributors.first().map(|p| p.id) else {
            return vec![];
        };
        let (share, remainder) = split(pot, contributors.len());
        for player in &contributors {
            self.credit(player.id, share);
        }
        self.credit(first, remainder);
        info!(
            "room {}: refunded ${pot} to {} players",
            self.id,
            contributors.len()
        );

        vec![SessionEvent::PotRefunded {
            contributors,
            pot,
            share,
            remainder,
        }]
    }

    fn clear_pot(&mut self) {
        for player in &mut self.players {
            player.contribution = 0;
            player.round_bet = 0;
        }
    }

    fn credit(&mut self, id: PlayerId, amount: Chips) {
        if let Some(player) = self.player_mut(id) {
            player.balance = player.balance.saturating_add(amount);
        }
    }

    /// Start the next hand's waiting period. Ignored unless settling.
    pub fn reset_for_next_round(&mut self) -> Vec<SessionEvent> {
        if self.status != SessionStatus::Settling {
            return vec![];
        }
        self.reset()
    }

    fn reset(&mut self) -> Vec<SessionEvent> {
        self.round += 1;
        let before = self.players.len();
        self.players.retain(Player::is_connected);
        let purged = before - self.players.len();

        let starting_stake = self.config.starting_stake;
        for player in &mut self.players {
            player.reset();
            if player.balance == 0 {
                player.balance = starting_stake;
                info!("{} replenished to ${starting_stake}", player.name);
            }
        }

        self.turn_order.clear();
        self.active = None;
        self.current_bet = 0;
        self.betting_round = 0;
        self.min_bet = self.config.min_bet;
        self.status = SessionStatus::Waiting;
        info!(
            "room {}: ready for hand {} ({purged} departed players removed)",
            self.id, self.round
        );

        vec![SessionEvent::RoundEnded {
            next_round: self.round,
            balances: self.balances(),
        }]
    }

    /// Abandon the hand after a structural inconsistency: contributions are
    /// refunded and the room goes back to waiting.
    pub fn recover(&mut self, err: &InvariantError) -> Vec<SessionEvent> {
        error!("room {}: {err}; refunding the hand", self.id);
        let mut events = self.refund();
        events.extend(self.reset());
        events
    }
}
