//! Three-card hand evaluation.
//!
//! Hands are ranked trail > pure sequence > sequence > color > pair > high
//! card. Suits never break ties, so two hands can evaluate equal.

use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt};
use thiserror::Error;

use super::cards::{ACE, Card, HAND_SIZE, Value, value_symbol};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandRank {
    HighCard,
    Pair,
    Color,
    Sequence,
    PureSequence,
    Trail,
}

impl HandRank {
    /// Numeric class used as the most significant part of a hand's score.
    #[must_use]
    pub fn class(&self) -> u32 {
        match self {
            Self::HighCard => 1,
            Self::Pair => 2,
            Self::Color => 3,
            Self::Sequence => 4,
            Self::PureSequence => 5,
            Self::Trail => 6,
        }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "High Card",
            Self::Pair => "Pair",
            Self::Color => "Color",
            Self::Sequence => "Sequence",
            Self::PureSequence => "Pure Sequence",
            Self::Trail => "Trail",
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
pub enum HandError {
    #[error("a hand needs exactly 3 cards, got {0}")]
    WrongSize(usize),
}

/// Rank class plus tie-break values, best first.
///
/// For pairs the key is `[pair, pair, kicker]`. For the A-2-3 sequence the
/// ace counts as 1, making it the lowest sequence.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct HandEvaluation {
    pub rank: HandRank,
    pub key: [Value; HAND_SIZE],
}

impl HandEvaluation {
    /// Single comparable number: `class * 10000 + primary * 100 + secondary`.
    #[must_use]
    pub fn score(&self) -> u32 {
        let [a, b, c] = self.key.map(u32::from);
        let tiebreak = match self.rank {
            HandRank::Trail => a * 100,
            HandRank::Pair => a * 100 + c,
            _ => a * 100 + b * 10 + c,
        };
        self.rank.class() * 10_000 + tiebreak
    }

    /// Human readable description, e.g. "Pair of 10s".
    #[must_use]
    pub fn description(&self) -> String {
        let top = value_symbol(self.key[0]);
        match self.rank {
            HandRank::Trail => format!("Trail of {top}s"),
            HandRank::PureSequence => format!("Pure Sequence, {top} high"),
            HandRank::Sequence => format!("Sequence, {top} high"),
            HandRank::Color => format!("Color, {top} high"),
            HandRank::Pair => format!("Pair of {top}s"),
            HandRank::HighCard => format!("High Card {top}"),
        }
    }
}

impl Ord for HandEvaluation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for HandEvaluation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for HandEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Evaluate a three-card hand. Doesn't mutate the input.
#[must_use]
pub fn evaluate(cards: &[Card; HAND_SIZE]) -> HandEvaluation {
    let mut values = cards.map(|card| card.value());
    values.sort_unstable_by(|a, b| b.cmp(a));
    let [hi, mid, lo] = values;

    let is_color = cards.iter().all(|card| card.suit() == cards[0].suit());
    let is_trail = hi == lo;
    let is_low_sequence = hi == ACE && mid == 3 && lo == 2;
    let is_sequence = (hi == mid + 1 && mid == lo + 1) || is_low_sequence;

    if is_trail {
        return HandEvaluation {
            rank: HandRank::Trail,
            key: values,
        };
    }

    if is_sequence {
        let key = if is_low_sequence { [3, 2, 1] } else { values };
        let rank = if is_color {
            HandRank::PureSequence
        } else {
            HandRank::Sequence
        };
        return HandEvaluation { rank, key };
    }

    if is_color {
        return HandEvaluation {
            rank: HandRank::Color,
            key: values,
        };
    }

    // Values are sorted, so a pair is always adjacent.
    if hi == mid {
        return HandEvaluation {
            rank: HandRank::Pair,
            key: [hi, mid, lo],
        };
    }
    if mid == lo {
        return HandEvaluation {
            rank: HandRank::Pair,
            key: [mid, lo, hi],
        };
    }

    HandEvaluation {
        rank: HandRank::HighCard,
        key: values,
    }
}

/// Evaluate untrusted input that may not hold exactly three cards.
pub fn evaluate_slice(cards: &[Card]) -> Result<HandEvaluation, HandError> {
    let hand: &[Card; HAND_SIZE] = cards
        .try_into()
        .map_err(|_| HandError::WrongSize(cards.len()))?;
    Ok(evaluate(hand))
}

/// Indices of the best hands. Ties return every tied index, in input order.
#[must_use]
pub fn winners(hands: &[HandEvaluation]) -> Vec<usize> {
    let Some(best) = hands.iter().max() else {
        return vec![];
    };
    hands
        .iter()
        .enumerate()
        .filter(|(_, hand)| *hand == best)
        .map(|(idx, _)| idx)
        .collect()
}
