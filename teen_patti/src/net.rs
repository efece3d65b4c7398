//! Wire protocol shared by the engine and the connection gateway.
//!
//! Messages are JSON objects tagged by a `type` field. Transport framing
//! lives in the gateway, not here.

/// Client intents and server notifications.
pub mod messages;
