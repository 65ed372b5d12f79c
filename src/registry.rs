//! Room Registry
//!
//! Maps room names to their members and each handle to the room it is in.
//! Both maps change together inside one `&mut self` call, so a handle is
//! never observed in two rooms, or in none between commands.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::room::Room;
use crate::types::{Handle, RoomName};

/// Result of a successful `join`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Room the handle was in before, if it moved
    pub previous: Option<RoomName>,
    /// Whether the target room did not exist yet
    pub created: bool,
    /// False when the handle was already in the target room
    pub joined: bool,
}

#[derive(Debug)]
pub struct RoomRegistry {
    /// All rooms ever referenced: RoomName -> Room
    rooms: BTreeMap<RoomName, Room>,
    /// Handle to room mapping for fast lookup: Handle -> RoomName
    memberships: HashMap<Handle, RoomName>,
}

impl RoomRegistry {
    /// Create a registry holding only the default room
    pub fn new() -> Self {
        let mut registry = Self {
            rooms: BTreeMap::new(),
            memberships: HashMap::new(),
        };
        registry.ensure_room(&RoomName::general());
        registry
    }

    /// Create the room if it does not exist
    ///
    /// Returns true if it was created by this call.
    pub fn ensure_room(&mut self, name: &RoomName) -> bool {
        if self.rooms.contains_key(name) {
            return false;
        }
        self.rooms.insert(name.clone(), Room::new(name.clone()));
        debug!("Room {} created", name);
        true
    }

    /// Move a handle into `room`, leaving its current room first
    ///
    /// Joining the room the handle is already in changes nothing and
    /// reports `joined: false`.
    pub fn join(&mut self, handle: &Handle, room: &RoomName) -> JoinOutcome {
        let created = self.ensure_room(room);

        if self.memberships.get(handle) == Some(room) {
            return JoinOutcome {
                previous: None,
                created,
                joined: false,
            };
        }

        let previous = self.leave(handle);

        if let Some(target) = self.rooms.get_mut(room) {
            target.add(handle.clone());
        }
        self.memberships.insert(handle.clone(), room.clone());

        JoinOutcome {
            previous,
            created,
            joined: true,
        }
    }

    /// Remove a handle from its room
    ///
    /// Returns the room it left, or `None` if it was not a member anywhere.
    pub fn leave(&mut self, handle: &Handle) -> Option<RoomName> {
        let room = self.memberships.remove(handle)?;
        if let Some(current) = self.rooms.get_mut(&room) {
            current.remove(handle);
        }
        Some(room)
    }

    /// Snapshot of a room's members, sorted; empty for unknown rooms
    pub fn members_of(&self, room: &RoomName) -> Vec<Handle> {
        self.rooms.get(room).map(Room::members).unwrap_or_default()
    }

    /// Snapshot of every room name, sorted
    pub fn all_room_names(&self) -> Vec<RoomName> {
        self.rooms.keys().cloned().collect()
    }

    /// The room a handle is currently in
    pub fn room_of(&self, handle: &Handle) -> Option<&RoomName> {
        self.memberships.get(handle)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
