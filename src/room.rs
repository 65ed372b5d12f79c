//! Room struct definition
//!
//! A named broadcast group and the handles currently inside it.

use std::collections::BTreeSet;

use crate::types::{Handle, RoomName};

/// Chat room
///
/// Members are kept ordered so listings are stable. An empty room is
/// still a room; nothing ever deletes it.
#[derive(Debug)]
pub struct Room {
    /// Room name
    pub name: RoomName,
    /// Current members
    members: BTreeSet<Handle>,
}

impl Room {
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: BTreeSet::new(),
        }
    }

    /// Add a member
    ///
    /// Returns false if the handle was already inside.
    pub fn add(&mut self, handle: Handle) -> bool {
        self.members.insert(handle)
    }

    /// Remove a member
    ///
    /// Returns false if the handle was not a member.
    pub fn remove(&mut self, handle: &Handle) -> bool {
        self.members.remove(handle)
    }

    /// Snapshot of the member list, sorted
    pub fn members(&self) -> Vec<Handle> {
        self.members.iter().cloned().collect()
    }
}
