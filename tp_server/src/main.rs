//! Teen Patti server running one actor task per room.

use std::net::SocketAddr;

use anyhow::Error;
use log::{info, warn};
use pico_args::Arguments;
use tp_server::{api, config::ServerConfig, logging, metrics};

const HELP: &str = "\
Run a Teen Patti WebSocket server

USAGE:
  tp_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --metrics-bind  IP:PORT  Prometheus exporter address [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:3000)
  METRICS_BIND             Prometheus exporter address (e.g., 0.0.0.0:9090)
  ROOM_MAX_PLAYERS         Seats per room (2-17)
  ROOM_MIN_BET             Smallest bet unless going all-in
  ROOM_BOOT_AMOUNT         Chips every player posts when cards are dealt
  ROOM_STARTING_STAKE      Balance for new and bankrupt players
  ROOM_MAX_BETTING_ROUNDS  Betting rounds before a forced showdown
  ROOM_TURN_TIMEOUT_SECS   Seconds a player has to act
  ROOM_SETTLE_DELAY_SECS   Seconds between settlement and the next hand
  RUST_LOG                 Log filter (default: info)
";

struct Args {
    bind: Option<SocketAddr>,
    metrics_bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {remaining:?}");
    }

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.metrics_bind)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Metrics exported at http://{addr}/metrics");
    }

    let bind = config.bind;
    info!(
        "Rooms: {} seats, min bet {}, boot {}, {}s turns",
        config.room.max_players,
        config.room.min_bet,
        config.room.boot_amount,
        config.room.turn_timeout_secs
    );

    let app = api::create_router(api::AppState::new(config));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind, e))?;

    info!("Server is running at http://{bind}. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
