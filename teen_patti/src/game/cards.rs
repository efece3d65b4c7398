use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Number of cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Number of cards dealt to each player.
pub const HAND_SIZE: usize = 3;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Spade, Self::Heart, Self::Diamond, Self::Club];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values. Twos are 2u8, aces are 14u8.
pub type Value = u8;

pub const MIN_VALUE: Value = 2;
pub const ACE: Value = 14;

/// A card is a tuple of a value (2..=14) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    #[must_use]
    pub fn value(&self) -> Value {
        self.0
    }

    #[must_use]
    pub fn suit(&self) -> Suit {
        self.1
    }
}

/// Symbol used for a value when rendering cards.
pub(crate) fn value_symbol(value: Value) -> String {
    match value {
        11 => "J".to_string(),
        12 => "Q".to_string(),
        13 => "K".to_string(),
        14 => "A".to_string(),
        v => v.to_string(),
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", value_symbol(self.0), self.1)
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum CardParseError {
    #[error("card `{0}` is missing a suit")]
    MissingSuit(String),
    #[error("unknown suit in card `{0}`")]
    UnknownSuit(String),
    #[error("unknown value in card `{0}`")]
    UnknownValue(String),
}

impl FromStr for Card {
    type Err = CardParseError;

    /// Parses cards such as `10♠`, `Q♥`, `Ad` or `7c`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s
            .chars()
            .last()
            .ok_or_else(|| CardParseError::MissingSuit(s.to_string()))?;
        let suit = match suit_char {
            '♣' | 'c' | 'C' => Suit::Club,
            '♦' | 'd' | 'D' => Suit::Diamond,
            '♥' | 'h' | 'H' => Suit::Heart,
            '♠' | 's' | 'S' => Suit::Spade,
            _ => return Err(CardParseError::UnknownSuit(s.to_string())),
        };
        let value_str = &s[..s.len() - suit_char.len_utf8()];
        if value_str.is_empty() {
            return Err(CardParseError::MissingSuit(s.to_string()));
        }
        let value = match value_str {
            "J" | "j" => 11,
            "Q" | "q" => 12,
            "K" | "k" => 13,
            "A" | "a" => ACE,
            v => match v.parse::<Value>() {
                Ok(v) if (MIN_VALUE..=10).contains(&v) => v,
                _ => return Err(CardParseError::UnknownValue(s.to_string())),
            },
        };
        Ok(Card(value, suit))
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum DealError {
    #[error("can't deal {requested} cards from a deck of {available}")]
    NotEnoughCards { requested: usize, available: usize },
}

/// A deck of cards. Cards are dealt by popping from the back.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    /// An ordered 52-card deck.
    #[must_use]
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for value in MIN_VALUE..=ACE {
                cards.push(Card(value, suit));
            }
        }
        Self { cards }
    }

    /// A uniformly shuffled 52-card deck.
    #[must_use]
    pub fn shuffled() -> Self {
        Self::shuffled_with(&mut rand::rng())
    }

    #[must_use]
    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::new();
        deck.shuffle(rng);
        deck
    }

    /// A deck that deals exactly `hands`, in order, on the next `deal`.
    /// Used for replays and scripted games.
    #[must_use]
    pub fn stacked(hands: &[[Card; HAND_SIZE]]) -> Self {
        let mut cards = Vec::with_capacity(hands.len() * HAND_SIZE);
        for pass in 0..HAND_SIZE {
            for hand in hands {
                cards.push(hand[pass]);
            }
        }
        cards.reverse();
        Self { cards }
    }

    /// Fisher-Yates shuffle of the remaining cards.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Deal three cards to each of `num_hands` players, one card to every
    /// player per pass.
    pub fn deal(&mut self, num_hands: usize) -> Result<Vec<[Card; HAND_SIZE]>, DealError> {
        let requested = num_hands * HAND_SIZE;
        if requested > self.cards.len() {
            return Err(DealError::NotEnoughCards {
                requested,
                available: self.cards.len(),
            });
        }

        let mut hands: Vec<Vec<Card>> = vec![Vec::with_capacity(HAND_SIZE); num_hands];
        for _ in 0..HAND_SIZE {
            for hand in hands.iter_mut() {
                // Length was checked above.
                if let Some(card) = self.cards.pop() {
                    hand.push(card);
                }
            }
        }

        Ok(hands
            .into_iter()
            .filter_map(|hand| <[Card; HAND_SIZE]>::try_from(hand).ok())
            .collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}
