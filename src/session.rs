//! Client session
//!
//! Opens the connection, sends the handshake and runs two roles at once:
//! the sender turns local input into protocol lines, the receiver keeps
//! draining server lines and renders them. The receiver never waits on
//! local input, so the server is never blocked writing to us.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::console::{parse_input, render, InputAction};
use crate::error::ClientError;
use crate::protocol::{ClientMessage, ServerMessage};

/// How the receiver role ended
#[derive(Debug, Default)]
struct Receipt {
    /// The server accepted the handshake
    registered: bool,
    /// Last error seen before the handshake was accepted
    rejection: Option<String>,
}

/// Connect and run a session until local quit or connection loss
///
/// `input` carries the user's lines; closing it counts as `/quit`.
pub async fn run_session<W>(
    config: &ClientConfig,
    input: mpsc::Receiver<String>,
    output: W,
) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
    info!("Connected to {}:{}", config.host, config.port);

    run_on_stream(stream, &config.handle, input, output, config.quit_timeout).await
}

/// Run a session over an already connected stream
pub async fn run_on_stream<W>(
    stream: TcpStream,
    handle: &str,
    mut input: mpsc::Receiver<String>,
    output: W,
    quit_timeout: Duration,
) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, mut write_half) = stream.into_split();

    let nick = ClientMessage::Nick(handle.to_string());
    write_half.write_all(format!("{}\n", nick).as_bytes()).await?;

    // Local notices are rendered by the receiver so output has one writer
    let (notice_tx, notice_rx) = mpsc::unbounded_channel::<String>();
    let mut receiver = tokio::spawn(receive_lines(read_half, notice_rx, output));

    let mut quitting = false;

    loop {
        tokio::select! {
            receipt = &mut receiver => {
                // Server closed first
                let receipt = receipt.unwrap_or_default();
                return if quitting {
                    Ok(())
                } else {
                    Err(lost(receipt))
                };
            }
            line = input.recv() => {
                let action = match line {
                    Some(line) => parse_input(&line),
                    None => InputAction::Send(ClientMessage::Quit),
                };

                match action {
                    InputAction::Send(msg) => {
                        let quit = msg == ClientMessage::Quit;
                        if let Err(e) = write_half.write_all(format!("{}\n", msg).as_bytes()).await {
                            warn!("Failed to send to server: {}", e);
                            break;
                        }
                        if quit {
                            quitting = true;
                            let _ = notice_tx.send("Disconnessione...".to_string());
                            break;
                        }
                    }
                    InputAction::Notice(text) => {
                        let _ = notice_tx.send(text);
                    }
                    InputAction::Ignore => {}
                }
            }
        }
    }

    drop(notice_tx);

    if !quitting {
        // The write failed, so the receiver is about to see the closure too
        let receipt = receiver.await.unwrap_or_default();
        return Err(lost(receipt));
    }

    match timeout(quit_timeout, &mut receiver).await {
        Ok(_) => debug!("Server closed the connection"),
        Err(_) => {
            debug!("Server did not close in time, dropping the connection");
            receiver.abort();
        }
    }
    let _ = write_half.shutdown().await;

    Ok(())
}

/// Classify an unexpected closure
fn lost(receipt: Receipt) -> ClientError {
    if receipt.registered {
        ClientError::ConnectionLost
    } else {
        ClientError::HandshakeRejected(
            receipt
                .rejection
                .unwrap_or_else(|| "connection closed".to_string()),
        )
    }
}

/// Receiver role: render server lines and local notices until the stream ends
async fn receive_lines<W>(
    read_half: OwnedReadHalf,
    mut notices: mpsc::UnboundedReceiver<String>,
    mut output: W,
) -> Receipt
where
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(read_half).lines();
    let mut receipt = Receipt::default();

    loop {
        let text = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let msg = ServerMessage::parse(&line);
                    match &msg {
                        ServerMessage::Ok(_) => receipt.registered = true,
                        ServerMessage::Error(text) if !receipt.registered => {
                            receipt.rejection = Some(text.clone());
                        }
                        _ => {}
                    }
                    render(&msg)
                }
                Ok(None) => {
                    debug!("Server closed the stream");
                    break;
                }
                Err(e) => {
                    warn!("Read error: {}", e);
                    break;
                }
            },
            Some(notice) = notices.recv() => notice,
        };

        if output.write_all(format!("{}\n", text).as_bytes()).await.is_err()
            || output.flush().await.is_err()
        {
            break;
        }
    }

    // Notices queued right before the closure, e.g. "Disconnessione..."
    while let Ok(notice) = notices.try_recv() {
        let _ = output.write_all(format!("{}\n", notice).as_bytes()).await;
    }
    let _ = output.flush().await;

    receipt
}
