//! Room Chat Server - Entry Point
//!
//! Opens the activity log, binds the listener and runs until Ctrl+C or
//! SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use room_chat::config::{DEFAULT_LOG_FILE, DEFAULT_PORT};
use room_chat::{run_server, shutdown_signal, ConnectionLog, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "room_chat_server", about = "Room-based TCP chat server")]
struct Args {
    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Activity log file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Seconds to wait for connections to close on shutdown
    #[arg(long, default_value_t = 5)]
    grace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_chat=info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        port: args.port,
        log_path: args.log_file,
        grace_period: Duration::from_secs(args.grace_secs),
        ..ServerConfig::default()
    };

    let log = Arc::new(ConnectionLog::open(&config.log_path)?);

    // Start TCP listener
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        "Chat server listening on port {}, logging to {}",
        config.port,
        config.log_path.display()
    );

    run_server(listener, config, log, shutdown_signal()).await?;

    Ok(())
}
