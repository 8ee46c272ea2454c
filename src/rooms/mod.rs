//! Room membership seam
//!
//! Voting and ranking only need three questions answered about rooms:
//! is this user a member, how many members are there, and which rooms are
//! live. The trait keeps those callers decoupled from wherever membership
//! actually lives; the in-memory directory backs tests and the demo.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: u64,
    pub name: String,
}

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn is_member(&self, room_id: u64, user_id: u64) -> bool;

    /// Member headcount, zero when the room is unknown.
    async fn member_count(&self, room_id: u64) -> usize;

    async fn active_rooms(&self) -> Vec<RoomInfo>;
}

struct RoomEntry {
    name: String,
    members: HashSet<u64>,
}

#[derive(Default)]
pub struct InMemoryRoomDirectory {
    rooms: DashMap<u64, RoomEntry>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room; an existing room keeps its current name and roster.
    pub fn add_room(&self, room_id: u64, name: &str) {
        self.rooms.entry(room_id).or_insert_with(|| RoomEntry {
            name: name.to_string(),
            members: HashSet::new(),
        });
    }

    pub fn add_member(&self, room_id: u64, user_id: u64) {
        if let Some(mut entry) = self.rooms.get_mut(&room_id) {
            entry.members.insert(user_id);
        }
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn is_member(&self, room_id: u64, user_id: u64) -> bool {
        self.rooms
            .get(&room_id)
            .map(|entry| entry.members.contains(&user_id))
            .unwrap_or(false)
    }

    async fn member_count(&self, room_id: u64) -> usize {
        self.rooms
            .get(&room_id)
            .map(|entry| entry.members.len())
            .unwrap_or(0)
    }

    async fn active_rooms(&self) -> Vec<RoomInfo> {
        let mut rooms: Vec<RoomInfo> = self
            .rooms
            .iter()
            .map(|entry| RoomInfo {
                id: *entry.key(),
                name: entry.name.clone(),
            })
            .collect();
        rooms.sort_by_key(|room| room.id);
        rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn membership_and_counts_reflect_the_roster() {
        let directory = InMemoryRoomDirectory::new();
        directory.add_room(1, "Alpha");
        directory.add_member(1, 10);
        directory.add_member(1, 11);
        directory.add_member(1, 11);

        assert!(directory.is_member(1, 10).await);
        assert!(!directory.is_member(1, 99).await);
        assert!(!directory.is_member(2, 10).await);
        assert_eq!(directory.member_count(1).await, 2);
        assert_eq!(directory.member_count(2).await, 0);
    }

    #[tokio::test]
    async fn re_adding_a_room_keeps_its_roster() {
        let directory = InMemoryRoomDirectory::new();
        directory.add_room(1, "Alpha");
        directory.add_member(1, 10);
        directory.add_room(1, "Renamed");

        assert_eq!(directory.member_count(1).await, 1);
        let rooms = directory.active_rooms().await;
        assert_eq!(rooms[0].name, "Alpha");
    }

    #[tokio::test]
    async fn active_rooms_are_ordered_by_id() {
        let directory = InMemoryRoomDirectory::new();
        directory.add_room(3, "Gamma");
        directory.add_room(1, "Alpha");
        directory.add_room(2, "Beta");

        let ids: Vec<u64> = directory.active_rooms().await.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
