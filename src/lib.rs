//! Room-based TCP Chat Server Library
//!
//! A line-oriented chat server: clients connect over plain TCP, pick a
//! nickname, talk in named rooms and whisper to each other. A matching
//! terminal client lives in `src/bin/client.rs`.
//!
//! # Features
//! - Nickname handshake (`NICK <nickname>`)
//! - Named rooms, created on first join, with `general` as the home room
//! - Room broadcast and private whispers
//! - Room and member listings
//! - Append-only activity log
//! - Graceful shutdown with a bounded grace period
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the client directory and the
//!   room registry
//! - Each connection has a `handler` task plus a writer task draining its
//!   outbound queue
//! - No locks needed for chat state - all access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use room_chat::{run_server, shutdown_signal, ConnectionLog, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let log = Arc::new(ConnectionLog::open(&config.log_path)?);
//!     let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
//!     run_server(listener, config, log, shutdown_signal()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection_log;
pub mod console;
pub mod directory;
pub mod error;
pub mod handler;
pub mod listener;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod server;
pub mod session;
pub mod signal;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use config::{ClientConfig, ServerConfig};
pub use connection_log::ConnectionLog;
pub use directory::ClientDirectory;
pub use error::{AppError, ClientError, SendError};
pub use handler::handle_connection;
pub use listener::{run_listener, run_server};
pub use protocol::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
pub use room::Room;
pub use server::{ChatServer, ServerCommand};
pub use session::run_session;
pub use signal::shutdown_signal;
pub use types::{ConnectionId, Handle, RoomName};
