//! Teen Patti game engine.
//!
//! - Deck and three-card hand evaluation
//! - Per-room session state: roster, turn order, bets and pot
//! - Turn progression, betting actions and settlement

pub mod cards;
pub mod entities;
pub mod errors;
pub mod events;
pub mod hand;
pub mod session;

mod betting;
mod settlement;
mod turns;

pub use errors::{InvariantError, SessionError, UserError};
pub use events::SessionEvent;
pub use session::Session;
