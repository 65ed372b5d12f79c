//! TCP connection handler
//!
//! Handles individual client connections: the `NICK` handshake, line
//! parsing, and forwarding commands to the ChatServer. A companion writer
//! task drains the connection's outbound queue onto the socket.
//!
//! States: `AwaitingHandshake` → `Active` → `Closed`.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::{ConnectionId, Handle};

/// Per-connection state owned by the handler task
struct Connection {
    id: ConnectionId,
    reader: BufReader<OwnedReadHalf>,
    /// Raw bytes of the line being read
    buf: Vec<u8>,
    /// Own outbound queue; the directory holds a clone once registered
    msg_tx: mpsc::Sender<ServerMessage>,
    cmd_tx: mpsc::Sender<ServerCommand>,
    shutdown: watch::Receiver<bool>,
    /// Bound handle; `None` before the handshake and after teardown
    handle: Option<Handle>,
}

/// Handle a new TCP connection
///
/// Runs the handshake, then the command loop, then teardown. Returns once
/// the outbound queue has been flushed and the socket closed.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    shutdown: watch::Receiver<bool>,
    outbound_buffer: usize,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let id = ConnectionId::new();
    debug!("Connection {} opened from {}", id, peer_addr);

    let (read_half, write_half) = stream.into_split();

    // Channel for server -> client lines
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(outbound_buffer);
    let mut writer = WriterGuard(tokio::spawn(write_lines(write_half, msg_rx, id)));

    let mut conn = Connection {
        id,
        reader: BufReader::new(read_half),
        buf: Vec::new(),
        msg_tx,
        cmd_tx,
        shutdown,
        handle: None,
    };

    let result = match conn.handshake().await {
        Ok(true) => conn.run().await,
        Ok(false) => Ok(()),
        Err(e) => Err(e),
    };

    conn.teardown().await;
    // Dropping our sender lets the writer finish once the directory entry is gone
    drop(conn);
    let _ = (&mut writer.0).await;

    debug!("Connection {} from {} closed", id, peer_addr);
    result
}

impl Connection {
    /// `AwaitingHandshake`: read the first line and try to bind a handle
    ///
    /// Returns true when the connection became `Active`.
    async fn handshake(&mut self) -> Result<bool, AppError> {
        let Some(line) = self.next_line().await? else {
            debug!("Connection {} closed before the handshake", self.id);
            return Ok(false);
        };

        let raw = match ClientMessage::parse(&line) {
            Ok(ClientMessage::Nick(raw)) => raw,
            _ => {
                warn!("Connection {} sent an invalid handshake", self.id);
                self.reject(AppError::InvalidHandshake).await;
                return Ok(false);
            }
        };

        let handle = match Handle::parse(&raw) {
            Ok(handle) => handle,
            Err(e) => {
                self.reject(e).await;
                return Ok(false);
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(ServerCommand::Register {
                id: self.id,
                handle: handle.clone(),
                sender: self.msg_tx.clone(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| AppError::ChannelSend)?;

        match reply_rx.await.map_err(|_| AppError::ChannelSend)? {
            Ok(()) => {
                info!("Connection {} is now '{}'", self.id, handle);
                self.handle = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.reject(e).await;
                Ok(false)
            }
        }
    }

    /// `Active`: forward each line to the ChatServer until quit, EOF or shutdown
    async fn run(&mut self) -> Result<(), AppError> {
        let Some(handle) = self.handle.clone() else {
            return Ok(());
        };

        while let Some(line) = self.next_line().await? {
            debug!("'{}' -> {}", handle, line);

            let (cmd, quit) = match ClientMessage::parse(&line) {
                Ok(msg) => {
                    let quit = msg == ClientMessage::Quit;
                    (client_message_to_command(handle.clone(), msg), quit)
                }
                Err(error) => (
                    ServerCommand::Reject {
                        handle: handle.clone(),
                        error,
                    },
                    false,
                ),
            };

            self.cmd_tx
                .send(cmd)
                .await
                .map_err(|_| AppError::ChannelSend)?;

            if quit {
                info!("'{}' quit", handle);
                break;
            }
        }

        Ok(())
    }

    /// `Closed`: release the handle; safe to call more than once
    async fn teardown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self
                .cmd_tx
                .send(ServerCommand::Disconnect {
                    id: self.id,
                    handle,
                })
                .await;
        }
    }

    /// Next inbound line, or `None` on EOF or server shutdown
    ///
    /// Invalid UTF-8 is replaced rather than treated as a read error.
    async fn next_line(&mut self) -> Result<Option<String>, AppError> {
        if *self.shutdown.borrow() {
            return Ok(None);
        }

        self.buf.clear();
        let read = tokio::select! {
            read = self.reader.read_until(b'\n', &mut self.buf) => read?,
            _ = self.shutdown.changed() => {
                debug!("Connection {} interrupted by shutdown", self.id);
                return Ok(None);
            }
        };
        if read == 0 {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Report a handshake failure; the caller closes the connection
    async fn reject(&self, error: AppError) {
        let _ = self.msg_tx.send(error.into()).await;
    }
}

/// Aborts the writer task when the handler goes away, including when the
/// handler itself is aborted at the end of the shutdown grace period
struct WriterGuard(JoinHandle<()>);

impl Drop for WriterGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Writer task: outbound queue -> socket, one line per message
async fn write_lines(
    mut writer: OwnedWriteHalf,
    mut msg_rx: mpsc::Receiver<ServerMessage>,
    id: ConnectionId,
) {
    while let Some(msg) = msg_rx.recv().await {
        let line = format!("{}\n", msg);
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write failed on connection {}: {}", id, e);
            break;
        }
    }

    let _ = writer.shutdown().await;
    debug!("Write task ended for connection {}", id);
}

/// Convert a ClientMessage to a ServerCommand
fn client_message_to_command(handle: Handle, msg: ClientMessage) -> ServerCommand {
    match msg {
        // Already bound; a second handshake is not a command
        ClientMessage::Nick(_) => ServerCommand::Reject {
            handle,
            error: AppError::UnknownCommand,
        },
        ClientMessage::Join(room) => ServerCommand::Join { handle, room },
        ClientMessage::Leave => ServerCommand::Leave { handle },
        ClientMessage::Whisper { target, text } => ServerCommand::Whisper {
            handle,
            target,
            text,
        },
        ClientMessage::List => ServerCommand::List { handle },
        ClientMessage::Users => ServerCommand::Users { handle },
        ClientMessage::Help => ServerCommand::Help { handle },
        ClientMessage::Quit => ServerCommand::Quit { handle },
        ClientMessage::Msg(text) => ServerCommand::Chat { handle, text },
    }
}
