//! HTTP/WebSocket API for the Teen Patti server.
//!
//! # Endpoints Overview
//!
//! - `GET /health` - Server health status
//! - `GET /api/rooms` - List active rooms
//! - `GET /ws` - WebSocket carrying the JSON game protocol
//!
//! Rooms are created and joined over the WebSocket; there is no REST
//! surface for game intents.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tp_server::api::{create_router, AppState};
//! use tp_server::config::ServerConfig;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let state = AppState::new(ServerConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod rate_limiter;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use teen_patti::RoomManager;
use tower_http::cors::CorsLayer;

use crate::{config::ServerConfig, metrics};

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request; the room directory is itself a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub room_manager: RoomManager,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            room_manager: RoomManager::new(config.room.clone()),
            config: Arc::new(config),
        }
    }
}

/// Create the API router with all endpoints and middleware.
///
/// ```text
/// GET  /health     - Health check
/// GET  /api/rooms  - Room listing
/// GET  /ws         - WebSocket
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rooms", get(list_rooms))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.1.0","rooms":2,"timestamp":"2026-01-01T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.room_manager.active_room_count().await;
    metrics::active_rooms(rooms);

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": rooms,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}

/// List every active room with its status and seat count.
async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.room_manager.list_rooms().await;
    metrics::active_rooms(rooms.len());
    Json(rooms)
}
