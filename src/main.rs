//! mini-mqttd: a minimal MQTT-style control-packet framing server
//!
//! Recognizes CONNECT, PINGREQ and DISCONNECT packets on a TCP byte stream
//! and answers with fixed CONNACK / PINGRESP acknowledgements.
//!
//! Features:
//! - Incremental framing, independent of how reads split the stream
//! - Sequential (mio) or task-per-connection (Tokio) acceptors
//! - Clean shutdown on SIGINT / SIGTERM
//! - Configuration via CLI arguments or TOML file

mod config;
mod protocols;
mod runtime;

use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        backlog = config.backlog,
        runtime = ?config.runtime,
        read_size = config.read_size,
        "Starting mini-mqttd"
    );

    runtime::run(&config)?;

    info!("Stopped");
    Ok(())
}
