//! Client Directory
//!
//! Maps handles to the connection that owns delivery for them.
//! Single source of truth for who is online.

use std::collections::HashMap;

use crate::client::Client;
use crate::types::{ConnectionId, Handle};

#[derive(Debug, Default)]
pub struct ClientDirectory {
    /// All registered clients: Handle -> Client
    clients: HashMap<Handle, Client>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its handle
    ///
    /// Returns false, leaving the existing entry untouched, if the handle
    /// is already taken.
    pub fn register(&mut self, client: Client) -> bool {
        if self.clients.contains_key(&client.handle) {
            return false;
        }
        self.clients.insert(client.handle.clone(), client);
        true
    }

    /// Remove the entry for `handle` if it belongs to connection `id`
    pub fn unregister(&mut self, handle: &Handle, id: ConnectionId) -> Option<Client> {
        match self.clients.get(handle) {
            Some(client) if client.id == id => self.clients.remove(handle),
            _ => None,
        }
    }

    pub fn lookup(&self, handle: &Handle) -> Option<&Client> {
        self.clients.get(handle)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
