//! Line protocol definitions
//!
//! Newline-delimited UTF-8 text. Every line is a keyword, a single space
//! and a payload. `ClientMessage` is what clients send, `ServerMessage`
//! is what the server pushes back.

use std::fmt;

use crate::error::AppError;
use crate::types::{Handle, RoomName};

pub const JOIN_USAGE: &str = "/join <room>";
pub const WHISPER_USAGE: &str = "/whisper <nick> <messaggio>";
pub const MSG_USAGE: &str = "MSG <messaggio>";

/// Client → Server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Handshake, only valid as the first line. The raw candidate is
    /// validated by the handler so an empty nickname gets its own error.
    Nick(String),
    /// Move to another room, creating it if needed
    Join(RoomName),
    /// Go back to the default room
    Leave,
    /// Private message to one handle
    Whisper { target: Handle, text: String },
    /// List all rooms
    List,
    /// List members of the current room
    Users,
    /// Describe the available commands
    Help,
    /// Close the session
    Quit,
    /// Broadcast to the current room
    Msg(String),
}

impl ClientMessage {
    /// Parse one inbound line
    ///
    /// Keywords are case-insensitive and may carry a leading `/`.
    /// Payloads are kept verbatim apart from the separator.
    pub fn parse(line: &str) -> Result<Self, AppError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        let keyword = keyword.strip_prefix('/').unwrap_or(keyword);

        match keyword.to_ascii_uppercase().as_str() {
            "NICK" => Ok(ClientMessage::Nick(rest.to_string())),
            "JOIN" => RoomName::parse(rest)
                .map(ClientMessage::Join)
                .ok_or(AppError::Usage(JOIN_USAGE)),
            "LEAVE" => Ok(ClientMessage::Leave),
            "WHISPER" => {
                let (target, text) = rest
                    .trim_start()
                    .split_once(' ')
                    .ok_or(AppError::Usage(WHISPER_USAGE))?;
                if text.trim().is_empty() {
                    return Err(AppError::Usage(WHISPER_USAGE));
                }
                let target = Handle::parse(target).map_err(|_| AppError::Usage(WHISPER_USAGE))?;
                Ok(ClientMessage::Whisper {
                    target,
                    text: text.to_string(),
                })
            }
            "LIST" => Ok(ClientMessage::List),
            "USERS" => Ok(ClientMessage::Users),
            "HELP" => Ok(ClientMessage::Help),
            "QUIT" => Ok(ClientMessage::Quit),
            "MSG" => {
                if rest.trim().is_empty() {
                    Err(AppError::Usage(MSG_USAGE))
                } else {
                    Ok(ClientMessage::Msg(rest.to_string()))
                }
            }
            _ => Err(AppError::UnknownCommand),
        }
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Nick(handle) => write!(f, "NICK {}", handle),
            ClientMessage::Join(room) => write!(f, "JOIN {}", room),
            ClientMessage::Leave => f.write_str("LEAVE"),
            ClientMessage::Whisper { target, text } => write!(f, "WHISPER {} {}", target, text),
            ClientMessage::List => f.write_str("LIST"),
            ClientMessage::Users => f.write_str("USERS"),
            ClientMessage::Help => f.write_str("HELP"),
            ClientMessage::Quit => f.write_str("QUIT"),
            ClientMessage::Msg(text) => write!(f, "MSG {}", text),
        }
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Success confirmation
    Ok(String),
    /// Failure
    Error(String),
    /// Informational text, e.g. room and user listings
    Info(String),
    /// Room message
    Chat { from: String, text: String },
    /// Private message
    Whisper { from: String, text: String },
    /// Someone entered the recipient's room
    Joined(String),
    /// Someone left the recipient's room
    Left(String),
    /// Anything the client does not recognize
    Unknown(String),
}

impl ServerMessage {
    /// Parse one line received from the server
    ///
    /// Never fails: unrecognized lines become `Unknown` so the client
    /// can still show them.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((keyword, rest)) = line.split_once(' ') else {
            return ServerMessage::Unknown(line.to_string());
        };

        let rest = rest.to_string();
        match keyword {
            "OK" => ServerMessage::Ok(rest),
            "ERROR" => ServerMessage::Error(rest),
            "INFO" => ServerMessage::Info(rest),
            "JOINED" => ServerMessage::Joined(rest),
            "LEFT" => ServerMessage::Left(rest),
            "MSG" | "WHISPER" => match rest.split_once(": ") {
                Some((from, text)) => {
                    let (from, text) = (from.to_string(), text.to_string());
                    if keyword == "MSG" {
                        ServerMessage::Chat { from, text }
                    } else {
                        ServerMessage::Whisper { from, text }
                    }
                }
                None => ServerMessage::Unknown(line.to_string()),
            },
            _ => ServerMessage::Unknown(line.to_string()),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Ok(text) => write!(f, "OK {}", text),
            ServerMessage::Error(text) => write!(f, "ERROR {}", text),
            ServerMessage::Info(text) => write!(f, "INFO {}", text),
            ServerMessage::Chat { from, text } => write!(f, "MSG {}: {}", from, text),
            ServerMessage::Whisper { from, text } => write!(f, "WHISPER {}: {}", from, text),
            ServerMessage::Joined(handle) => write!(f, "JOINED {}", handle),
            ServerMessage::Left(handle) => write!(f, "LEFT {}", handle),
            ServerMessage::Unknown(line) => f.write_str(line),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let text = match &err {
            AppError::InvalidHandshake => "Protocollo non valido. Usa: NICK nickname".to_string(),
            AppError::InvalidNickname => "Nickname non valido".to_string(),
            AppError::NicknameTaken => "Nickname già in uso".to_string(),
            AppError::UserNotFound(handle) => format!("Utente {} non trovato", handle),
            AppError::AlreadyInDefaultRoom => "Sei già nella room general".to_string(),
            AppError::NotInRoom => "Non sei in alcuna room".to_string(),
            AppError::Usage(syntax) => format!("Uso: {}", syntax),
            AppError::UnknownCommand => "Comando non riconosciuto. Usa /help".to_string(),
            // Fatal errors are not typically converted (connection closes)
            AppError::Io(_) | AppError::ChannelSend => "Errore interno".to_string(),
        };
        ServerMessage::Error(text)
    }
}
