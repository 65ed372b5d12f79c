//! Server Listener
//!
//! Accepts connections, spawns one handler task per connection and owns
//! shutdown: stop accepting, tell every handler to close, wait a bounded
//! grace period, abort whatever is left.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection_log::{ConnectionLog, SERVER_ACTOR};
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::{ChatServer, ServerCommand};

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Run the ChatServer actor and the accept loop until `shutdown` resolves
///
/// Writes the start and stop entries to the activity log.
pub async fn run_server<F>(
    listener: TcpListener,
    config: ServerConfig,
    log: Arc<ConnectionLog>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    log.append(SERVER_ACTOR, "Server avviato")?;

    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    let mut server = tokio::spawn(ChatServer::new(cmd_rx, Arc::clone(&log)).run());
    info!("ChatServer actor started");

    run_listener(listener, cmd_tx, &config, shutdown).await;

    // Handlers are gone, so the actor drains what is queued and stops
    match timeout(config.grace_period, &mut server).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("ChatServer task failed: {}", e),
        Err(_) => {
            warn!("ChatServer did not stop within the grace period, aborting");
            server.abort();
        }
    }

    log.append(SERVER_ACTOR, "Server arrestato")?;
    info!("Server stopped");
    Ok(())
}

/// Connection accept loop
///
/// A failed accept is logged and the loop keeps going; only `shutdown`
/// ends it.
pub async fn run_listener<F>(
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: &ServerConfig,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handlers = FuturesUnordered::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let cmd_tx = cmd_tx.clone();
                        let shutdown_rx = shutdown_rx.clone();
                        let outbound_buffer = config.outbound_buffer;

                        // Spawn handler task for each connection
                        handlers.push(tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, cmd_tx, shutdown_rx, outbound_buffer).await
                            {
                                error!("Connection handler error: {}", e);
                            }
                        }));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
            // Reap finished handlers
            Some(_) = handlers.next(), if !handlers.is_empty() => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    let _ = shutdown_tx.send(true);

    if !handlers.is_empty() {
        info!("Waiting for {} connection(s) to close", handlers.len());
    }

    let drained = timeout(config.grace_period, async {
        while handlers.next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            "Grace period elapsed, aborting {} connection(s)",
            handlers.len()
        );
        for handler in handlers.iter() {
            handler.abort();
        }
    }
}
