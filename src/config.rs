//! Runtime configuration for the server and the client
//!
//! The binaries build these from their command line; tests build them
//! directly.

use std::path::PathBuf;
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 9999;

/// Default server host for the client
pub const DEFAULT_HOST: &str = "localhost";

/// Default activity log file
pub const DEFAULT_LOG_FILE: &str = "chat.log";

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Activity log location
    pub log_path: PathBuf,
    /// How long shutdown waits for connection handlers before aborting them
    pub grace_period: Duration,
    /// Capacity of the handler → ChatServer command channel
    pub command_buffer: usize,
    /// Capacity of each connection's outbound line queue
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            grace_period: Duration::from_secs(5),
            command_buffer: 256,
            outbound_buffer: 32,
        }
    }
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub handle: String,
    pub host: String,
    pub port: u16,
    /// How long to wait for the server to close after a local quit
    pub quit_timeout: Duration,
}

impl ClientConfig {
    pub fn new(handle: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            handle: handle.into(),
            host: host.into(),
            port,
            quit_timeout: Duration::from_secs(2),
        }
    }

    /// `User<nnnn>` derived from the current time
    pub fn generated_handle() -> String {
        format!("User{}", chrono::Utc::now().timestamp_millis().rem_euclid(10_000))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Self::generated_handle(), DEFAULT_HOST, DEFAULT_PORT)
    }
}
