//! Error types for the chat server and client
//!
//! Defines application-level errors, outbound queue errors and
//! client session errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (send an `ERROR` line to the client).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// First line was not a `NICK` command
    #[error("Invalid handshake")]
    InvalidHandshake,

    /// Empty nickname in the handshake
    #[error("Invalid nickname")]
    InvalidNickname,

    /// Nickname held by another connection
    #[error("Nickname already in use")]
    NicknameTaken,

    /// Whisper target is not connected
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// `LEAVE` issued from the default room
    #[error("Already in the default room")]
    AlreadyInDefaultRoom,

    /// Client is not in any room
    #[error("Not in room")]
    NotInRoom,

    /// Known command with missing arguments; carries the expected syntax
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// Unrecognized command keyword
    #[error("Unknown command")]
    UnknownCommand,
}

impl AppError {
    /// Whether the connection has to be closed after reporting this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Io(_)
                | AppError::ChannelSend
                | AppError::InvalidHandshake
                | AppError::InvalidNickname
                | AppError::NicknameTaken
        )
    }
}

/// Message send errors
///
/// Occurs when attempting to enqueue a line for a connection whose
/// writer has already gone away.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Client session errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// IO error while connecting or writing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server refused the handshake (nickname invalid or taken)
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// The server closed the stream without a local quit
    #[error("Connection to the server lost")]
    ConnectionLost,
}
