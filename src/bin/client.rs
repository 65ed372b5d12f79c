//! Room Chat Client - Entry Point
//!
//! Reads commands from stdin and prints what the server sends.

use std::io::BufRead;
use std::process;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use room_chat::config::{DEFAULT_HOST, DEFAULT_PORT};
use room_chat::console::{banner, failure_notice};
use room_chat::{run_session, shutdown_signal, ClientConfig};

#[derive(Parser, Debug)]
#[command(name = "room_chat_client", about = "Terminal client for the room chat server")]
struct Args {
    /// Nickname, generated when omitted
    handle: Option<String>,

    /// Server host
    #[arg(default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stderr so they never interleave with chat output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_chat=warn")),
        )
        .init();

    let args = Args::parse();
    let handle = args.handle.unwrap_or_else(ClientConfig::generated_handle);
    let config = ClientConfig::new(handle, args.host, args.port);

    println!(
        "Connessione a {}:{} come {}",
        config.host, config.port, config.handle
    );
    println!("{}", banner());

    let (input_tx, input_rx) = mpsc::channel::<String>(32);

    // Blocking stdin reader thread
    let stdin_tx = input_tx.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if stdin_tx.blocking_send(line).is_err() {
                return;
            }
        }
        // End of input behaves like /quit
        let _ = stdin_tx.blocking_send("/quit".to_string());
    });

    // Ctrl+C behaves like /quit
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = input_tx.send("/quit".to_string()).await;
    });

    if let Err(e) = run_session(&config, input_rx, tokio::io::stdout()).await {
        error!("Session ended: {}", e);
        eprintln!("{}", failure_notice(&e));
        process::exit(1);
    }
}
