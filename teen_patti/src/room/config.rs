//! Room configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    cards::{DECK_SIZE, HAND_SIZE},
    entities::Chips,
};

/// Most players a single deck can deal into a hand.
pub const MAX_SEATS: usize = DECK_SIZE / HAND_SIZE;

/// Longest turn timeout or settle delay, in seconds.
pub const MAX_COUNTDOWN_SECS: u64 = 3600;

/// Room configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum number of players (default: 5)
    pub max_players: usize,

    /// Players needed before the host can start (default: 2)
    pub min_players: usize,

    /// Smallest bet a player can place unless going all-in
    pub min_bet: Chips,

    /// Chips every player posts into the pot when cards are dealt
    pub boot_amount: Chips,

    /// Balance used for new players without one and for replenishing
    /// bankrupt players between hands
    pub starting_stake: Chips,

    /// Betting rounds per hand before a forced showdown
    pub max_betting_rounds: u8,

    /// Seconds the active player has to act
    pub turn_timeout_secs: u64,

    /// Seconds between settlement and the next hand's reset
    pub settle_delay_secs: u64,

    /// Longest chat message in characters
    pub max_chat_length: usize,

    /// Randomize turn order at the start of each hand
    pub shuffle_turn_order: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 5,
            min_players: 2,
            min_bet: 5,
            boot_amount: 0,
            starting_stake: 1000,
            max_betting_rounds: 3,
            turn_timeout_secs: 20,
            settle_delay_secs: 3,
            max_chat_length: 500,
            shuffle_turn_order: true,
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_players < 2 {
            return Err("Min players must be at least 2".to_string());
        }

        if self.max_players < self.min_players || self.max_players > MAX_SEATS {
            return Err(format!(
                "Max players must be between {} and {MAX_SEATS}",
                self.min_players
            ));
        }

        if self.min_bet == 0 {
            return Err("Min bet must be positive".to_string());
        }

        if self.starting_stake == 0 {
            return Err("Starting stake must be positive".to_string());
        }

        if self.max_betting_rounds == 0 {
            return Err("Max betting rounds must be at least 1".to_string());
        }

        if self.turn_timeout_secs == 0 || self.turn_timeout_secs > MAX_COUNTDOWN_SECS {
            return Err(format!(
                "Turn timeout must be between 1 and {MAX_COUNTDOWN_SECS} seconds"
            ));
        }

        if self.settle_delay_secs > MAX_COUNTDOWN_SECS {
            return Err(format!(
                "Settle delay must be at most {MAX_COUNTDOWN_SECS} seconds"
            ));
        }

        if self.max_chat_length == 0 {
            return Err("Max chat length must be positive".to_string());
        }

        Ok(())
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}
