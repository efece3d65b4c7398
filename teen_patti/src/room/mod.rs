//! Room module providing multi-room support with the async actor model.
//!
//! Each room runs in its own Tokio task with an mpsc inbox. The task owns
//! the room's [`Session`](crate::game::session::Session) and its turn
//! countdown, so player intents and timeouts are applied one at a time.
//! The [`RoomManager`] spawns rooms and keeps the directory used for
//! matchmaking and lookups.

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;
pub mod timer;

pub use actor::{RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use manager::RoomManager;
pub use messages::{Outbox, PlayerAction, RoomError, RoomMessage, RoomResponse, Seat};
