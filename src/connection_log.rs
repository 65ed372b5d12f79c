//! Connection Log
//!
//! Append-only activity record. One line per entry:
//! `[YYYY-MM-DD HH:MM:SS] <actor>: <text>`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::Local;

use crate::error::AppError;

/// Actor name used for server lifecycle entries
pub const SERVER_ACTOR: &str = "SERVER";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamped append-only log shared by every connection
///
/// Each `append` holds the lock for exactly one formatted line and its
/// flush, so concurrent writers never interleave partial lines.
pub struct ConnectionLog {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConnectionLog {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(file))
    }

    /// Log into an arbitrary writer
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// A log that discards every entry
    pub fn disabled() -> Self {
        Self::from_writer(std::io::sink())
    }

    /// Write one entry and flush it before returning
    pub fn append(&self, actor: &str, text: &str) -> Result<(), AppError> {
        let line = format!("[{}] {}: {}\n", Local::now().format(TIMESTAMP_FORMAT), actor, text);

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLog").finish_non_exhaustive()
    }
}
