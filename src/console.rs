//! Console front end for the client
//!
//! Turns what the user types into protocol messages and server lines into
//! text for the terminal.

use crate::error::ClientError;
use crate::protocol::{ClientMessage, ServerMessage, JOIN_USAGE, WHISPER_USAGE};
use crate::types::{Handle, RoomName};

/// What to do with one line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    /// Write this message to the server
    Send(ClientMessage),
    /// Show this text locally, send nothing
    Notice(String),
    /// Blank input
    Ignore,
}

/// Translate a line typed by the user
///
/// Slash commands map to protocol commands, anything else is a room message.
pub fn parse_input(line: &str) -> InputAction {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return InputAction::Ignore;
    }
    if !line.starts_with('/') {
        return InputAction::Send(ClientMessage::Msg(line.to_string()));
    }

    let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
    let cmd = cmd.to_lowercase();

    match cmd.as_str() {
        "/join" => match RoomName::parse(rest) {
            Some(room) => InputAction::Send(ClientMessage::Join(room)),
            None => usage(JOIN_USAGE),
        },
        "/leave" => InputAction::Send(ClientMessage::Leave),
        "/whisper" => {
            let Some((target, text)) = rest.trim_start().split_once(' ') else {
                return usage(WHISPER_USAGE);
            };
            match Handle::parse(target) {
                Ok(target) if !text.trim().is_empty() => {
                    InputAction::Send(ClientMessage::Whisper {
                        target,
                        text: text.to_string(),
                    })
                }
                _ => usage(WHISPER_USAGE),
            }
        }
        "/list" => InputAction::Send(ClientMessage::List),
        "/users" => InputAction::Send(ClientMessage::Users),
        "/help" => InputAction::Send(ClientMessage::Help),
        "/quit" => InputAction::Send(ClientMessage::Quit),
        _ => InputAction::Notice(format!("Comando non riconosciuto: {}", cmd)),
    }
}

fn usage(syntax: &str) -> InputAction {
    InputAction::Notice(format!("Uso: {}", syntax))
}

/// Text shown for one server line
pub fn render(msg: &ServerMessage) -> String {
    match msg {
        ServerMessage::Chat { from, text } => format!("{}: {}", from, text),
        ServerMessage::Whisper { from, text } => format!("[PRIVATO] {}: {}", from, text),
        ServerMessage::Joined(handle) => format!("[JOIN] {} è entrato nella room", handle),
        ServerMessage::Left(handle) => format!("[LEFT] {} è uscito dalla room", handle),
        ServerMessage::Ok(text) => format!("[SUCCESS] {}", text),
        ServerMessage::Error(text) => format!("[ERRORE] {}", text),
        ServerMessage::Info(text) => format!("[INFO] {}", text),
        ServerMessage::Unknown(line) => line.clone(),
    }
}

/// Text shown when a session ends without a local quit
pub fn failure_notice(err: &ClientError) -> String {
    match err {
        ClientError::Io(e) => format!("Errore nella connessione al server: {}", e),
        ClientError::HandshakeRejected(text) => format!("Connessione rifiutata dal server: {}", text),
        ClientError::ConnectionLost => "Connessione con il server persa".to_string(),
    }
}

/// Command summary printed when the client starts
pub fn banner() -> String {
    [
        "",
        "=== CLIENT DI CHAT ===",
        "Comandi disponibili:",
        "  /join <room>   - Entra in una room",
        "  /leave         - Esci dalla room corrente",
        "  /whisper <nick> <msg> - Messaggio privato",
        "  /list          - Lista delle room",
        "  /users         - Lista utenti nella room corrente",
        "  /help          - Aiuto dal server",
        "  /quit          - Esci dalla chat",
        "  Inserisci un messaggio e premi Invio per inviarlo alla room",
        "=====================",
        "",
    ]
    .join("\n")
}
