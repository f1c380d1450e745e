//! In-memory room registry: video id -> live connections.
//!
//! Rooms exist only while they have members. Nothing here is persisted, so a
//! restart drops every room and clients must join again.

use axum::extract::ws::Message;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use vidnote_proto::{encode, Envelope, Id, ServerEnvelope};

use crate::ws::ConnectionSender;

/// Server-assigned identity of one accepted socket.
pub type ConnectionId = Uuid;

/// Tracks which connections are in which video room.
///
/// Cloning is cheap and every clone shares the same map. The map is a DashMap
/// so connection actors on different runtime threads can join, leave, and
/// broadcast without a global lock.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    /// room key -> (connection id -> outbound channel)
    rooms: Arc<DashMap<String, HashMap<ConnectionId, ConnectionSender>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to the room for `video_id`, creating the room if needed.
    ///
    /// Returns false if the connection was already a member, in which case
    /// nothing changes and it still receives each broadcast once.
    pub fn add_to_room(
        &self,
        video_id: &Id,
        connection_id: ConnectionId,
        sender: ConnectionSender,
    ) -> bool {
        let mut room = self.rooms.entry(video_id.room_key()).or_default();
        match room.value_mut().entry(connection_id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(sender);
                true
            }
        }
    }

    /// Remove a connection from a room. Empty rooms are pruned.
    pub fn remove_from_room(&self, video_id: &Id, connection_id: ConnectionId) -> bool {
        let key = video_id.room_key();
        let removed = match self.rooms.get_mut(&key) {
            Some(mut room) => room.value_mut().remove(&connection_id).is_some(),
            None => false,
        };
        self.rooms.remove_if(&key, |_, room| room.is_empty());
        removed
    }

    pub fn is_member(&self, video_id: &Id, connection_id: ConnectionId) -> bool {
        self.rooms
            .get(&video_id.room_key())
            .map(|room| room.contains_key(&connection_id))
            .unwrap_or(false)
    }

    /// Send an envelope to every member of a room except `exclude`.
    ///
    /// Best-effort: a member whose channel is already closed is skipped.
    /// Returns how many members the frame was handed to.
    pub fn broadcast(
        &self,
        video_id: &Id,
        envelope: &ServerEnvelope,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let text = match encode(envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, kind = envelope.kind(), "Failed to encode broadcast");
                return 0;
            }
        };
        let msg = Message::Text(text.into());

        let Some(room) = self.rooms.get(&video_id.room_key()) else {
            return 0;
        };

        let mut delivered = 0;
        for (connection_id, sender) in room.value().iter() {
            if Some(*connection_id) == exclude {
                continue;
            }
            if sender.send(msg.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn member_count(&self, video_id: &Id) -> usize {
        self.rooms
            .get(&video_id.room_key())
            .map(|room| room.len())
            .unwrap_or(0)
    }

    /// Total joined connections across all rooms.
    pub fn connection_count(&self) -> usize {
        self.rooms.iter().map(|room| room.value().len()).sum()
    }
}
