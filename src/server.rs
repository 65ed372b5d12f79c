//! ChatServer Actor implementation
//!
//! The central actor that owns the Room Registry and the Client Directory.
//! Every command is processed to completion before the next one, which
//! serializes all membership changes and fan-out enumerations.
//!
//! The actor never touches a socket. It queues lines on each recipient's
//! bounded outbound channel and that connection's writer task does the
//! write. A recipient with a full queue makes the actor wait, which is the
//! accepted backpressure trade-off: one stalled reader slows fan-out for
//! everyone until its queue drains or its connection drops.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::client::Client;
use crate::connection_log::ConnectionLog;
use crate::directory::ClientDirectory;
use crate::error::AppError;
use crate::protocol::ServerMessage;
use crate::registry::{JoinOutcome, RoomRegistry};
use crate::types::{ConnectionId, Handle, RoomName, DEFAULT_ROOM};

const HELP_LINES: [&str; 7] = [
    "Comandi disponibili:",
    " /join <room>  - Entra in una room",
    " /leave        - Esci dalla room corrente",
    " /whisper <nick> <msg> - Messaggio privato",
    " /list         - Lista delle room",
    " /users        - Lista utenti nella room corrente",
    " /quit         - Esci dalla chat",
];

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Handshake accepted by the handler; bind the handle
    Register {
        id: ConnectionId,
        handle: Handle,
        sender: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    /// Connection closed; idempotent
    Disconnect {
        id: ConnectionId,
        handle: Handle,
    },
    /// Move to a room
    Join {
        handle: Handle,
        room: RoomName,
    },
    /// Return to the default room
    Leave {
        handle: Handle,
    },
    /// Private message
    Whisper {
        handle: Handle,
        target: Handle,
        text: String,
    },
    /// List rooms
    List {
        handle: Handle,
    },
    /// List members of the caller's room
    Users {
        handle: Handle,
    },
    /// Describe the commands
    Help {
        handle: Handle,
    },
    /// Say goodbye before the handler closes
    Quit {
        handle: Handle,
    },
    /// Room broadcast
    Chat {
        handle: Handle,
        text: String,
    },
    /// Report an in-session protocol error to the caller
    Reject {
        handle: Handle,
        error: AppError,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// Who is online: Handle -> Client
    directory: ClientDirectory,
    /// Rooms and memberships
    rooms: RoomRegistry,
    /// Activity log
    log: Arc<ConnectionLog>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, log: Arc<ConnectionLog>) -> Self {
        Self {
            directory: ClientDirectory::new(),
            rooms: RoomRegistry::new(),
            log,
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Register {
                id,
                handle,
                sender,
                reply,
            } => {
                let result = self.handle_register(id, handle, sender).await;
                let _ = reply.send(result);
            }
            ServerCommand::Disconnect { id, handle } => {
                self.handle_disconnect(id, handle).await;
            }
            ServerCommand::Join { handle, room } => {
                self.handle_join(handle, room).await;
            }
            ServerCommand::Leave { handle } => {
                self.handle_leave(handle).await;
            }
            ServerCommand::Whisper {
                handle,
                target,
                text,
            } => {
                self.handle_whisper(handle, target, text).await;
            }
            ServerCommand::List { handle } => {
                self.handle_list(handle).await;
            }
            ServerCommand::Users { handle } => {
                self.handle_users(handle).await;
            }
            ServerCommand::Help { handle } => {
                for line in HELP_LINES {
                    self.reply(&handle, ServerMessage::Info(line.to_string())).await;
                }
            }
            ServerCommand::Quit { handle } => {
                self.reply(&handle, ServerMessage::Ok("Arrivederci!".to_string())).await;
            }
            ServerCommand::Chat { handle, text } => {
                self.handle_chat(handle, text).await;
            }
            ServerCommand::Reject { handle, error } => {
                self.reply(&handle, error.into()).await;
            }
        }
    }

    /// Handle a handshake: bind the handle and enter the default room
    async fn handle_register(
        &mut self,
        id: ConnectionId,
        handle: Handle,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<(), AppError> {
        if !self.directory.register(Client::new(id, handle.clone(), sender)) {
            info!("Nickname '{}' rejected: already in use", handle);
            return Err(AppError::NicknameTaken);
        }

        info!("Client {} registered as '{}'", id, handle);
        self.move_to(&handle, &RoomName::general()).await;

        self.reply(
            &handle,
            ServerMessage::Ok(format!("Benvenuto nella chat! Room corrente: {}", DEFAULT_ROOM)),
        )
        .await;
        self.reply(
            &handle,
            ServerMessage::Info(
                "Usa /join <room>, /leave, /whisper <nick> <msg>, /list, /users, /quit".to_string(),
            ),
        )
        .await;

        debug!(
            "Total clients: {}, Total rooms: {}",
            self.directory.client_count(),
            self.rooms.room_count()
        );
        Ok(())
    }

    /// Handle client disconnection
    async fn handle_disconnect(&mut self, id: ConnectionId, handle: Handle) {
        // Already torn down, or the handle now belongs to a newer connection
        if self.directory.unregister(&handle, id).is_none() {
            return;
        }

        if let Some(room) = self.rooms.leave(&handle) {
            self.broadcast(&room, ServerMessage::Left(handle.to_string()), None)
                .await;
        }

        info!("Client {} ('{}') disconnected", id, handle);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.directory.client_count(),
            self.rooms.room_count()
        );
    }

    /// Handle room joining
    async fn handle_join(&mut self, handle: Handle, room: RoomName) {
        self.move_to(&handle, &room).await;

        self.reply(&handle, ServerMessage::Ok(format!("Entrato nella room: {}", room)))
            .await;
        let listing = self.users_line(&room);
        self.reply(&handle, listing).await;
    }

    /// Handle voluntary room leaving
    async fn handle_leave(&mut self, handle: Handle) {
        let current = self.rooms.room_of(&handle).cloned();
        match current {
            None => {
                self.reply(&handle, AppError::NotInRoom.into()).await;
            }
            Some(room) if room.is_default() => {
                self.reply(&handle, AppError::AlreadyInDefaultRoom.into()).await;
            }
            Some(_) => {
                self.move_to(&handle, &RoomName::general()).await;
                self.reply(
                    &handle,
                    ServerMessage::Ok(format!("Tornato nella room: {}", DEFAULT_ROOM)),
                )
                .await;
            }
        }
    }

    /// Handle a private message
    async fn handle_whisper(&mut self, handle: Handle, target: Handle, text: String) {
        let Some(recipient) = self.directory.lookup(&target) else {
            self.reply(&handle, AppError::UserNotFound(target.to_string()).into())
                .await;
            return;
        };

        let _ = recipient
            .send(ServerMessage::Whisper {
                from: handle.to_string(),
                text,
            })
            .await;

        self.record(handle.as_str(), &format!("[WHISPER to {}]", target));
        self.reply(
            &handle,
            ServerMessage::Ok(format!("Messaggio privato inviato a {}", target)),
        )
        .await;
    }

    /// Handle room listing
    async fn handle_list(&mut self, handle: Handle) {
        let names: Vec<String> = self
            .rooms
            .all_room_names()
            .iter()
            .map(RoomName::to_string)
            .collect();
        self.reply(
            &handle,
            ServerMessage::Info(format!("Room disponibili: {}", names.join(", "))),
        )
        .await;
    }

    /// Handle member listing of the caller's room
    async fn handle_users(&mut self, handle: Handle) {
        let Some(room) = self.rooms.room_of(&handle).cloned() else {
            self.reply(&handle, AppError::NotInRoom.into()).await;
            return;
        };
        let listing = self.users_line(&room);
        self.reply(&handle, listing).await;
    }

    /// Handle chat message
    async fn handle_chat(&mut self, handle: Handle, text: String) {
        let Some(room) = self.rooms.room_of(&handle).cloned() else {
            self.reply(&handle, AppError::NotInRoom.into()).await;
            return;
        };

        self.record(handle.as_str(), &format!("[{}] {}", room, text));
        self.broadcast(
            &room,
            ServerMessage::Chat {
                from: handle.to_string(),
                text,
            },
            None,
        )
        .await;
    }

    /// Helper: Move a handle into `room` and notify both rooms involved
    ///
    /// `LEFT` goes to the remaining members of the previous room and
    /// `JOINED` to the other members of the new one.
    async fn move_to(&mut self, handle: &Handle, room: &RoomName) -> JoinOutcome {
        let outcome = self.rooms.join(handle, room);

        if outcome.created {
            info!("Room {} created by '{}'", room, handle);
        }
        if let Some(previous) = &outcome.previous {
            self.broadcast(previous, ServerMessage::Left(handle.to_string()), None)
                .await;
        }
        if outcome.joined {
            debug!("'{}' joined room {}", handle, room);
            self.broadcast(room, ServerMessage::Joined(handle.to_string()), Some(handle))
                .await;
        }

        outcome
    }

    /// Helper: Queue a line for every member of `room`, optionally skipping one
    async fn broadcast(&self, room: &RoomName, msg: ServerMessage, except: Option<&Handle>) {
        for member in self.rooms.members_of(room) {
            if Some(&member) == except {
                continue;
            }
            if let Some(client) = self.directory.lookup(&member) {
                if client.send(msg.clone()).await.is_err() {
                    debug!("Outbound queue closed for '{}'", member);
                }
            }
        }
    }

    /// Helper: Queue a line for one handle
    async fn reply(&self, handle: &Handle, msg: ServerMessage) {
        if let Some(client) = self.directory.lookup(handle) {
            if client.send(msg).await.is_err() {
                debug!("Outbound queue closed for '{}'", handle);
            }
        }
    }

    /// Helper: `INFO Utenti in <room>: a, b`
    fn users_line(&self, room: &RoomName) -> ServerMessage {
        let members: Vec<String> = self
            .rooms
            .members_of(room)
            .iter()
            .map(Handle::to_string)
            .collect();
        ServerMessage::Info(format!("Utenti in {}: {}", room, members.join(", ")))
    }

    /// Helper: Append to the activity log; failures never affect the session
    fn record(&self, actor: &str, text: &str) {
        if let Err(e) = self.log.append(actor, text) {
            error!("Failed to write chat log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    struct TestClient {
        id: ConnectionId,
        handle: Handle,
        rx: mpsc::Receiver<ServerMessage>,
    }

    impl TestClient {
        async fn next(&mut self) -> ServerMessage {
            timeout(Duration::from_secs(1), self.rx.recv())
                .await
                .expect("timed out waiting for a line")
                .expect("outbound queue closed")
        }

        /// Round-trip through the actor and check nothing else was queued
        async fn assert_idle(&mut self, cmd_tx: &mpsc::Sender<ServerCommand>) {
            cmd_tx
                .send(ServerCommand::Help {
                    handle: self.handle.clone(),
                })
                .await
                .unwrap();
            assert_eq!(
                self.next().await,
                ServerMessage::Info(HELP_LINES[0].to_string())
            );
            for _ in 1..HELP_LINES.len() {
                self.next().await;
            }
        }
    }

    fn start() -> mpsc::Sender<ServerCommand> {
        start_with_log(Arc::new(ConnectionLog::disabled()))
    }

    fn start_with_log(log: Arc<ConnectionLog>) -> mpsc::Sender<ServerCommand> {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(ChatServer::new(cmd_rx, log).run());
        cmd_tx
    }

    async fn try_register(
        cmd_tx: &mpsc::Sender<ServerCommand>,
        name: &str,
    ) -> Result<TestClient, AppError> {
        let (tx, rx) = mpsc::channel(64);
        let (reply_tx, reply_rx) = oneshot::channel();
        let id = ConnectionId::new();
        let handle = Handle::parse(name).unwrap();
        cmd_tx
            .send(ServerCommand::Register {
                id,
                handle: handle.clone(),
                sender: tx,
                reply: reply_tx,
            })
            .await
            .unwrap();
        reply_rx.await.unwrap()?;
        Ok(TestClient { id, handle, rx })
    }

    /// Register and consume the welcome lines
    async fn register(cmd_tx: &mpsc::Sender<ServerCommand>, name: &str) -> TestClient {
        let mut client = try_register(cmd_tx, name).await.unwrap();
        assert!(matches!(client.next().await, ServerMessage::Ok(_)));
        assert!(matches!(client.next().await, ServerMessage::Info(_)));
        client
    }

    async fn join(cmd_tx: &mpsc::Sender<ServerCommand>, client: &mut TestClient, room: &str) {
        cmd_tx
            .send(ServerCommand::Join {
                handle: client.handle.clone(),
                room: RoomName::parse(room).unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(
            client.next().await,
            ServerMessage::Ok(format!("Entrato nella room: {}", room))
        );
        assert!(matches!(client.next().await, ServerMessage::Info(_)));
    }

    async fn chat(cmd_tx: &mpsc::Sender<ServerCommand>, client: &TestClient, text: &str) {
        cmd_tx
            .send(ServerCommand::Chat {
                handle: client.handle.clone(),
                text: text.to_string(),
            })
            .await
            .unwrap();
    }

    fn chat_line(from: &str, text: &str) -> ServerMessage {
        ServerMessage::Chat {
            from: from.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_welcome_lines() {
        let cmd_tx = start();
        let mut alice = try_register(&cmd_tx, "alice").await.unwrap();

        assert_eq!(
            alice.next().await,
            ServerMessage::Ok("Benvenuto nella chat! Room corrente: general".to_string())
        );
        assert!(matches!(alice.next().await, ServerMessage::Info(text) if text.starts_with("Usa ")));
    }

    #[tokio::test]
    async fn test_duplicate_nickname_rejected() {
        let cmd_tx = start();
        let _alice = register(&cmd_tx, "alice").await;

        let second = try_register(&cmd_tx, "alice").await;
        assert!(matches!(second, Err(AppError::NicknameTaken)));
    }

    #[tokio::test]
    async fn test_concurrent_same_handle_one_wins() {
        let cmd_tx = start();
        let (a, b) = tokio::join!(try_register(&cmd_tx, "carol"), try_register(&cmd_tx, "carol"));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let failure = if a.is_err() { a.err() } else { b.err() };
        assert!(matches!(failure, Some(AppError::NicknameTaken)));
    }

    #[tokio::test]
    async fn test_joined_notifies_others_only() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;

        // bob's arrival in general was announced to alice
        assert_eq!(alice.next().await, ServerMessage::Joined("bob".to_string()));

        join(&cmd_tx, &mut alice, "lobby").await;
        assert_eq!(bob.next().await, ServerMessage::Left("alice".to_string()));

        join(&cmd_tx, &mut bob, "lobby").await;
        assert_eq!(alice.next().await, ServerMessage::Joined("bob".to_string()));
        bob.assert_idle(&cmd_tx).await;
    }

    #[tokio::test]
    async fn test_join_listing_contains_caller() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;

        cmd_tx
            .send(ServerCommand::Join {
                handle: alice.handle.clone(),
                room: RoomName::parse("lobby").unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(
            alice.next().await,
            ServerMessage::Ok("Entrato nella room: lobby".to_string())
        );
        assert_eq!(
            alice.next().await,
            ServerMessage::Info("Utenti in lobby: alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_rejoin_same_room_is_silent() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob

        join(&cmd_tx, &mut bob, "general").await;
        alice.assert_idle(&cmd_tx).await;
    }

    #[tokio::test]
    async fn test_sole_member_gets_own_message_once() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob
        join(&cmd_tx, &mut alice, "lobby").await;
        bob.next().await; // LEFT alice

        chat(&cmd_tx, &alice, "echo").await;

        assert_eq!(alice.next().await, chat_line("alice", "echo"));
        alice.assert_idle(&cmd_tx).await;
        bob.assert_idle(&cmd_tx).await;
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob
        join(&cmd_tx, &mut bob, "lobby").await;
        alice.next().await; // LEFT bob

        chat(&cmd_tx, &alice, "in general").await;
        chat(&cmd_tx, &bob, "in lobby").await;

        assert_eq!(alice.next().await, chat_line("alice", "in general"));
        assert_eq!(bob.next().await, chat_line("bob", "in lobby"));
        alice.assert_idle(&cmd_tx).await;
        bob.assert_idle(&cmd_tx).await;
    }

    #[tokio::test]
    async fn test_whisper_delivered_to_target_only() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        let mut carol = register(&cmd_tx, "carol").await;
        alice.next().await; // JOINED bob
        alice.next().await; // JOINED carol
        bob.next().await; // JOINED carol

        cmd_tx
            .send(ServerCommand::Whisper {
                handle: alice.handle.clone(),
                target: bob.handle.clone(),
                text: "hi".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            bob.next().await,
            ServerMessage::Whisper {
                from: "alice".to_string(),
                text: "hi".to_string(),
            }
        );
        assert_eq!(
            alice.next().await,
            ServerMessage::Ok("Messaggio privato inviato a bob".to_string())
        );
        carol.assert_idle(&cmd_tx).await;
    }

    #[tokio::test]
    async fn test_whisper_unknown_target() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;

        cmd_tx
            .send(ServerCommand::Whisper {
                handle: alice.handle.clone(),
                target: Handle::parse("ghost").unwrap(),
                text: "boo".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            alice.next().await,
            ServerMessage::Error("Utente ghost non trovato".to_string())
        );
    }

    #[tokio::test]
    async fn test_leave_returns_to_general() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob
        join(&cmd_tx, &mut alice, "lobby").await;
        bob.next().await; // LEFT alice

        cmd_tx
            .send(ServerCommand::Leave {
                handle: alice.handle.clone(),
            })
            .await
            .unwrap();

        assert_eq!(
            alice.next().await,
            ServerMessage::Ok("Tornato nella room: general".to_string())
        );
        assert_eq!(bob.next().await, ServerMessage::Joined("alice".to_string()));
    }

    #[tokio::test]
    async fn test_leave_from_general_is_an_error() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;

        cmd_tx
            .send(ServerCommand::Leave {
                handle: alice.handle.clone(),
            })
            .await
            .unwrap();

        assert_eq!(
            alice.next().await,
            ServerMessage::Error("Sei già nella room general".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_and_users() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob
        join(&cmd_tx, &mut bob, "lobby").await;
        alice.next().await; // LEFT bob

        cmd_tx
            .send(ServerCommand::List {
                handle: alice.handle.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            alice.next().await,
            ServerMessage::Info("Room disponibili: general, lobby".to_string())
        );

        cmd_tx
            .send(ServerCommand::Users {
                handle: alice.handle.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            alice.next().await,
            ServerMessage::Info("Utenti in general: alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_members_once() {
        let cmd_tx = start();
        let alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;

        for _ in 0..2 {
            cmd_tx
                .send(ServerCommand::Disconnect {
                    id: alice.id,
                    handle: alice.handle.clone(),
                })
                .await
                .unwrap();
        }

        assert_eq!(bob.next().await, ServerMessage::Left("alice".to_string()));
        bob.assert_idle(&cmd_tx).await;

        cmd_tx
            .send(ServerCommand::Users {
                handle: bob.handle.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            bob.next().await,
            ServerMessage::Info("Utenti in general: bob".to_string())
        );
    }

    #[tokio::test]
    async fn test_sole_member_disconnect_notifies_nobody() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob
        join(&cmd_tx, &mut alice, "lobby").await;
        assert_eq!(bob.next().await, ServerMessage::Left("alice".to_string()));

        cmd_tx
            .send(ServerCommand::Disconnect {
                id: alice.id,
                handle: alice.handle.clone(),
            })
            .await
            .unwrap();
        bob.assert_idle(&cmd_tx).await;

        // The room survives, empty
        cmd_tx
            .send(ServerCommand::Join {
                handle: bob.handle.clone(),
                room: RoomName::parse("lobby").unwrap(),
            })
            .await
            .unwrap();
        assert_eq!(
            bob.next().await,
            ServerMessage::Ok("Entrato nella room: lobby".to_string())
        );
        assert_eq!(
            bob.next().await,
            ServerMessage::Info("Utenti in lobby: bob".to_string())
        );
    }

    #[tokio::test]
    async fn test_handle_reusable_after_disconnect() {
        let cmd_tx = start();
        let first = register(&cmd_tx, "alice").await;

        cmd_tx
            .send(ServerCommand::Disconnect {
                id: first.id,
                handle: first.handle.clone(),
            })
            .await
            .unwrap();
        let mut second = register(&cmd_tx, "alice").await;

        // A late teardown from the first connection must not evict the second
        cmd_tx
            .send(ServerCommand::Disconnect {
                id: first.id,
                handle: first.handle.clone(),
            })
            .await
            .unwrap();
        second.assert_idle(&cmd_tx).await;
    }

    #[tokio::test]
    async fn test_reject_reports_error() {
        let cmd_tx = start();
        let mut alice = register(&cmd_tx, "alice").await;

        cmd_tx
            .send(ServerCommand::Reject {
                handle: alice.handle.clone(),
                error: AppError::UnknownCommand,
            })
            .await
            .unwrap();

        assert_eq!(
            alice.next().await,
            ServerMessage::Error("Comando non riconosciuto. Usa /help".to_string())
        );
    }

    #[tokio::test]
    async fn test_activity_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        let cmd_tx = start_with_log(Arc::new(ConnectionLog::open(&path).unwrap()));
        let mut alice = register(&cmd_tx, "alice").await;
        let mut bob = register(&cmd_tx, "bob").await;
        alice.next().await; // JOINED bob

        chat(&cmd_tx, &alice, "hello").await;
        cmd_tx
            .send(ServerCommand::Whisper {
                handle: alice.handle.clone(),
                target: bob.handle.clone(),
                text: "secret".to_string(),
            })
            .await
            .unwrap();
        alice.next().await; // MSG alice: hello
        alice.next().await; // OK whisper sent
        bob.next().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] alice: [general] hello"));
        assert!(lines[1].ends_with("] alice: [WHISPER to bob]"));
        assert!(!contents.contains("secret"));
    }
}
