//! WebSocket gateway for the Teen Patti room engine.
//!
//! Exposes the engine's JSON protocol over a single WebSocket endpoint and a
//! small HTTP surface for health checks and room listings.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
