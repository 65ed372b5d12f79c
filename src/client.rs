//! Client struct definition
//!
//! A registered connection as seen by the Client Directory: its handle,
//! the connection that owns it, and the queue feeding its socket writer.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::protocol::ServerMessage;
use crate::types::{ConnectionId, Handle};

/// Registered client
#[derive(Debug)]
pub struct Client {
    /// Connection that registered this handle
    pub id: ConnectionId,
    /// Nickname bound during the handshake
    pub handle: Handle,
    /// Server → Client line queue, drained by the connection's writer task
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    pub fn new(id: ConnectionId, handle: Handle, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, handle, sender }
    }

    /// Queue a line for this client
    ///
    /// Waits while the queue is full. Returns an error if the writer
    /// has already gone away (client disconnected).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_send() {
        let (tx, mut rx) = mpsc::channel(32);
        let client = Client::new(ConnectionId::new(), Handle::parse("alice").unwrap(), tx);

        client.send(ServerMessage::Joined("bob".to_string())).await.unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::Joined("bob".to_string())));
    }

    #[tokio::test]
    async fn test_client_send_closed() {
        let (tx, rx) = mpsc::channel(32);
        let client = Client::new(ConnectionId::new(), Handle::parse("alice").unwrap(), tx);
        drop(rx);

        let result = client.send(ServerMessage::Ok("hi".to_string())).await;
        assert!(matches!(result, Err(SendError::ChannelClosed)));
    }
}
