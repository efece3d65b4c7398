//! Player actions during a betting round.

use log::debug;

use super::{
    entities::{Chips, FoldReason, PlayerId, PlayerStatus, SessionStatus},
    errors::UserError,
    events::{Reveal, SessionEvent},
    session::Session,
};

impl Session {
    /// Index of `id` in the roster, if it's their turn to act.
    fn ensure_turn(&self, id: PlayerId) -> Result<usize, UserError> {
        if self.status != SessionStatus::Betting {
            return Err(UserError::NoActionsAllowed {
                status: self.status,
            });
        }
        let idx = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or(UserError::NotInRoom)?;
        if self.active_player() != Some(id) {
            return Err(UserError::NotYourTurn);
        }
        Ok(idx)
    }

    /// Put `amount` chips in. Betting a player's whole balance is always
    /// allowed, even below the minimum bet.
    pub fn bet(&mut self, id: PlayerId, amount: Chips) -> Result<Vec<SessionEvent>, UserError> {
        let idx = self.ensure_turn(id)?;
        let player = &self.players[idx];
        if amount == 0 {
            return Err(UserError::InvalidAmount);
        }
        if amount > player.balance {
            return Err(UserError::InsufficientBalance {
                required: amount,
                available: player.balance,
            });
        }
        let all_in = amount == player.balance;
        if amount < self.min_bet && !all_in {
            return Err(UserError::BelowMinimumBet {
                min_bet: self.min_bet,
            });
        }

        let player = &mut self.players[idx];
        player.balance -= amount;
        player.contribution += amount;
        player.round_bet += amount;
        player.acted = true;
        player.status = PlayerStatus::Bet;
        let (round_bet, balance) = (player.round_bet, player.balance);

        let raised = round_bet > self.current_bet;
        if raised {
            self.current_bet = round_bet;
            for (other_idx, other) in self.players.iter_mut().enumerate() {
                if other_idx != idx && other.in_hand() {
                    other.acted = false;
                }
            }
        }
        debug!(
            "room {}: {id} bet ${amount} (round bet ${round_bet}, to call ${})",
            self.id, self.current_bet
        );

        let mut events = vec![SessionEvent::BetPlaced {
            player: self.player_ref(id),
            amount,
            raised,
            all_in,
            pot: self.pot(),
            current_bet: self.current_bet,
            balance,
        }];
        events.extend(self.advance_turn());
        Ok(events)
    }

    pub fn check(&mut self, id: PlayerId) -> Result<Vec<SessionEvent>, UserError> {
        let idx = self.ensure_turn(id)?;
        let player = &mut self.players[idx];
        let to_call = self.current_bet.saturating_sub(player.round_bet);
        if to_call > 0 {
            return Err(UserError::CannotCheck { to_call });
        }
        player.acted = true;
        player.status = PlayerStatus::Checked;

        let mut events = vec![SessionEvent::PlayerChecked {
            player: self.player_ref(id),
        }];
        events.extend(self.advance_turn());
        Ok(events)
    }

    pub fn fold(&mut self, id: PlayerId) -> Result<Vec<SessionEvent>, UserError> {
        self.ensure_turn(id)?;
        Ok(self.fold_player(id, FoldReason::Voluntary))
    }

    /// Show the active player's hand to the room. With only two players
    /// left this calls for the showdown.
    pub fn reveal(&mut self, id: PlayerId) -> Result<Vec<SessionEvent>, UserError> {
        let idx = self.ensure_turn(id)?;
        let player = &mut self.players[idx];
        let (Some(cards), Some(hand)) = (player.hand, player.evaluate()) else {
            return Err(UserError::NoActionsAllowed {
                status: self.status,
            });
        };
        player.revealed = Some(hand);
        player.acted = true;
        player.status = PlayerStatus::Showing;

        let mut events = vec![SessionEvent::Showdown {
            reveals: vec![Reveal {
                player_id: id,
                player_name: player.name.clone(),
                cards: cards.to_vec(),
                hand: hand.into(),
            }],
        }];
        if self.non_folded_count() == 2 {
            events.extend(self.showdown());
        } else {
            events.extend(self.advance_turn());
        }
        Ok(events)
    }
}
