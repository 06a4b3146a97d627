use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

/// Explicit `lobby_id -> set<connection_id>` mapping used for event fan-out.
///
/// Room membership is decoupled from any transport grouping primitive: the
/// WebSocket layer joins a connection into a room when the user enters a
/// lobby and removes it on leave/disconnect.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<Uuid, HashSet<Uuid>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room.
    pub fn join(&self, room_id: Uuid, connection_id: Uuid) {
        self.rooms
            .entry(room_id)
            .or_default()
            .insert(connection_id);
    }

    /// Remove a connection from a room, dropping the room once empty.
    pub fn leave(&self, room_id: Uuid, connection_id: Uuid) {
        if let Some(mut members) = self.rooms.get_mut(&room_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                drop(members);
                self.rooms.remove_if(&room_id, |_, members| members.is_empty());
            }
        }
    }

    /// Remove a connection from every room it is in, returning the rooms left.
    pub fn leave_all(&self, connection_id: Uuid) -> Vec<Uuid> {
        let mut left = Vec::new();
        for mut entry in self.rooms.iter_mut() {
            if entry.value_mut().remove(&connection_id) {
                left.push(*entry.key());
            }
        }
        self.rooms.retain(|_, members| !members.is_empty());
        left
    }

    /// Snapshot the member connections of a room.
    pub fn members(&self, room_id: Uuid) -> Vec<Uuid> {
        self.rooms
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_leave_and_membership() {
        let rooms = RoomRegistry::new();
        let room = Uuid::new_v4();
        let conn = Uuid::new_v4();

        rooms.join(room, conn);
        assert_eq!(rooms.members(room), vec![conn]);

        rooms.leave(room, conn);
        assert!(rooms.members(room).is_empty());
    }

    #[test]
    fn leave_all_sweeps_every_room() {
        let rooms = RoomRegistry::new();
        let conn = Uuid::new_v4();
        let other = Uuid::new_v4();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        rooms.join(room_a, conn);
        rooms.join(room_b, conn);
        rooms.join(room_b, other);

        let mut left = rooms.leave_all(conn);
        left.sort();
        let mut expected = vec![room_a, room_b];
        expected.sort();
        assert_eq!(left, expected);

        assert!(rooms.members(room_a).is_empty());
        assert_eq!(rooms.members(room_b), vec![other]);
    }
}
