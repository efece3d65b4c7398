//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use teen_patti::RoomConfig;

/// Default HTTP/WebSocket bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus exporter address, exporter disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Config for every room opened by the server
    pub room: RoomConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `metrics_bind_override` - Optional metrics address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if an address variable is set but can't be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        metrics_bind_override: Option<SocketAddr>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or_else(default_bind),
        };
        let metrics_bind = match metrics_bind_override {
            Some(addr) => Some(addr),
            None => parse_addr("METRICS_BIND")?,
        };

        let defaults = RoomConfig::default();
        let room = RoomConfig {
            max_players: parse_env_or("ROOM_MAX_PLAYERS", defaults.max_players),
            min_players: parse_env_or("ROOM_MIN_PLAYERS", defaults.min_players),
            min_bet: parse_env_or("ROOM_MIN_BET", defaults.min_bet),
            boot_amount: parse_env_or("ROOM_BOOT_AMOUNT", defaults.boot_amount),
            starting_stake: parse_env_or("ROOM_STARTING_STAKE", defaults.starting_stake),
            max_betting_rounds: parse_env_or(
                "ROOM_MAX_BETTING_ROUNDS",
                defaults.max_betting_rounds,
            ),
            turn_timeout_secs: parse_env_or("ROOM_TURN_TIMEOUT_SECS", defaults.turn_timeout_secs),
            settle_delay_secs: parse_env_or("ROOM_SETTLE_DELAY_SECS", defaults.settle_delay_secs),
            max_chat_length: parse_env_or("ROOM_MAX_CHAT_LENGTH", defaults.max_chat_length),
            shuffle_turn_order: parse_env_or(
                "ROOM_SHUFFLE_TURN_ORDER",
                defaults.shuffle_turn_order,
            ),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            room,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        self.room
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "ROOM_*".to_string(),
                reason,
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_bind: None,
            room: RoomConfig::default(),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid address in {var}: {value}")]
    InvalidAddress { var: String, value: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Parse an optional socket address. Unset is fine, garbage is not.
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidAddress {
                var: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
