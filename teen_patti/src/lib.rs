//! # Teen Patti
//!
//! A real-time, multiplayer, turn-based engine for the three-card game
//! Teen Patti.
//!
//! Rooms are matched and tracked by a [`RoomManager`]. Each room runs as
//! its own actor that owns a [`Session`] state machine:
//!
//! - **Waiting**: players join, the host starts the hand
//! - **Dealing**: every player gets three cards and posts the boot
//! - **Betting**: players act in a fixed, shuffled turn order, each with a
//!   countdown that folds them when it runs out
//! - **Showdown**: remaining hands are revealed and compared
//! - **Settling**: the pot is paid out, then the room resets
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, hand evaluation, and the session state machine
//! - [`room`]: Room actors, countdowns, and the room directory
//! - [`net`]: JSON wire protocol
//!
//! ## Example
//!
//! ```
//! use teen_patti::game::{cards::Card, hand::{HandRank, evaluate}};
//!
//! let hand: [Card; 3] = ["10♠", "10♥", "2♣"].map(|c| c.parse().unwrap());
//! assert_eq!(evaluate(&hand).rank, HandRank::Pair);
//! ```

/// Core game logic, entities, and the session state machine.
pub mod game;
pub use game::{
    InvariantError, Session, SessionError, SessionEvent, UserError,
    cards::{self, Card, Deck},
    entities::{self, Chips, ConnectionId, PlayerId, ReconnectToken, RoomId},
    hand::{self, HandEvaluation, HandRank},
};

/// Wire protocol types.
pub mod net;
pub use net::messages::{ClientMessage, ServerMessage};

/// Room actors and the room directory.
pub mod room;
pub use room::{RoomConfig, RoomError, RoomHandle, RoomManager};
