use vidnote_proto::{decode, ClientEnvelope, Envelope, Id, ServerEnvelope};

use crate::error::RelayError;
use crate::rooms::{ConnectionId, RoomRegistry};
use crate::ws::{send_envelope, ConnectionSender};

/// Lifecycle of a relay connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// Socket open, no room yet.
    Connected,
    /// Member of exactly one room.
    Joined(Id),
    /// Terminal; room membership has been released.
    Closed,
}

/// Per-connection dispatcher. Owns the connection's room membership and
/// turns inbound envelopes into registry operations.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    tx: ConnectionSender,
    rooms: RoomRegistry,
    phase: Phase,
}

impl Connection {
    pub fn new(id: ConnectionId, tx: ConnectionSender, rooms: RoomRegistry) -> Self {
        Self {
            id,
            tx,
            rooms,
            phase: Phase::Connected,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Decode one text frame and apply it.
    pub fn handle_text(&mut self, text: &str) -> Result<(), RelayError> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        let envelope: ClientEnvelope = decode(text)?;
        tracing::trace!(connection_id = %self.id, kind = envelope.kind(), "Envelope received");
        self.dispatch(envelope)
    }

    fn dispatch(&mut self, envelope: ClientEnvelope) -> Result<(), RelayError> {
        match envelope {
            ClientEnvelope::Join { video_id, user_id } => self.join(video_id, user_id),
            ClientEnvelope::NewComment { video_id, comment } => {
                self.ensure_member(&video_id)?;
                let delivered = self.rooms.broadcast(
                    &video_id,
                    &ServerEnvelope::NewComment { comment },
                    Some(self.id),
                );
                tracing::debug!(
                    connection_id = %self.id,
                    video_id = %video_id,
                    delivered,
                    "Relayed new comment"
                );
                Ok(())
            }
            ClientEnvelope::Typing {
                video_id,
                user_id,
                is_typing,
            } => {
                self.ensure_member(&video_id)?;
                self.rooms.broadcast(
                    &video_id,
                    &ServerEnvelope::Typing { user_id, is_typing },
                    Some(self.id),
                );
                Ok(())
            }
        }
    }

    fn join(&mut self, video_id: Id, user_id: Id) -> Result<(), RelayError> {
        if let Phase::Joined(current) = &self.phase {
            if current.room_key() != video_id.room_key() {
                self.rooms.remove_from_room(current, self.id);
                tracing::debug!(
                    connection_id = %self.id,
                    video_id = %current,
                    "Left previous room"
                );
            }
        }

        self.rooms.add_to_room(&video_id, self.id, self.tx.clone());
        send_envelope(
            &self.tx,
            &ServerEnvelope::Joined {
                video_id: video_id.clone(),
            },
        )?;

        tracing::info!(
            connection_id = %self.id,
            video_id = %video_id,
            user_id = %user_id,
            members = self.rooms.member_count(&video_id),
            "Joined room"
        );
        self.phase = Phase::Joined(video_id);
        Ok(())
    }

    fn ensure_member(&self, video_id: &Id) -> Result<(), RelayError> {
        match &self.phase {
            Phase::Joined(current) if current.room_key() == video_id.room_key() => Ok(()),
            _ => Err(RelayError::NotInRoom(video_id.clone())),
        }
    }

    /// Release room membership. Safe to call more than once.
    pub fn close(&mut self) {
        if let Phase::Joined(video_id) = std::mem::replace(&mut self.phase, Phase::Closed) {
            self.rooms.remove_from_room(&video_id, self.id);
            tracing::debug!(
                connection_id = %self.id,
                video_id = %video_id,
                "Left room on close"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::Message;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn connect(rooms: &RoomRegistry) -> (Connection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(Uuid::new_v4(), tx, rooms.clone()), rx)
    }

    fn next_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> Option<Value> {
        match rx.try_recv().ok()? {
            Message::Text(text) => Some(serde_json::from_str(text.as_str()).unwrap()),
            other => panic!("Expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_join_acknowledges_only_joiner() {
        let rooms = RoomRegistry::new();
        let (mut a, mut a_rx) = connect(&rooms);
        let (mut b, mut b_rx) = connect(&rooms);

        a.handle_text(r#"{"type":"join","videoId":42,"userId":1}"#).unwrap();
        assert_eq!(next_json(&mut a_rx), Some(json!({"type": "joined", "videoId": 42})));
        assert_eq!(a.phase(), &Phase::Joined(Id::Int(42)));

        b.handle_text(r#"{"type":"join","videoId":42,"userId":2}"#).unwrap();
        assert!(next_json(&mut a_rx).is_none());
        assert!(next_json(&mut b_rx).is_some());
        assert_eq!(rooms.member_count(&Id::Int(42)), 2);
    }

    #[test]
    fn test_comment_reaches_peer_not_sender() {
        let rooms = RoomRegistry::new();
        let (mut a, mut a_rx) = connect(&rooms);
        let (mut b, mut b_rx) = connect(&rooms);
        a.handle_text(r#"{"type":"join","videoId":42,"userId":1}"#).unwrap();
        b.handle_text(r#"{"type":"join","videoId":42,"userId":2}"#).unwrap();
        next_json(&mut a_rx);
        next_json(&mut b_rx);

        a.handle_text(r#"{"type":"new_comment","videoId":42,"comment":{"id":1,"content":"nice tone"}}"#)
            .unwrap();

        assert_eq!(
            next_json(&mut b_rx),
            Some(json!({"type": "new_comment", "comment": {"id": 1, "content": "nice tone"}}))
        );
        assert!(next_json(&mut a_rx).is_none());
    }

    #[test]
    fn test_rejoin_moves_between_rooms() {
        let rooms = RoomRegistry::new();
        let (mut a, mut a_rx) = connect(&rooms);

        a.handle_text(r#"{"type":"join","videoId":1,"userId":1}"#).unwrap();
        a.handle_text(r#"{"type":"join","videoId":2,"userId":1}"#).unwrap();
        next_json(&mut a_rx);
        next_json(&mut a_rx);

        assert_eq!(rooms.member_count(&Id::Int(1)), 0);
        assert_eq!(rooms.member_count(&Id::Int(2)), 1);
        assert_eq!(rooms.room_count(), 1);
    }

    #[test]
    fn test_relay_requires_membership() {
        let rooms = RoomRegistry::new();
        let (mut a, _a_rx) = connect(&rooms);
        let (mut c, mut c_rx) = connect(&rooms);
        c.handle_text(r#"{"type":"join","videoId":2,"userId":3}"#).unwrap();
        next_json(&mut c_rx);

        let err = a
            .handle_text(r#"{"type":"typing","videoId":2,"userId":1,"isTyping":true}"#)
            .unwrap_err();
        assert!(matches!(err, RelayError::NotInRoom(Id::Int(2))));
        assert!(next_json(&mut c_rx).is_none());
    }

    #[test]
    fn test_malformed_frames_leave_state_unchanged() {
        let rooms = RoomRegistry::new();
        let (mut a, mut a_rx) = connect(&rooms);

        assert!(matches!(a.handle_text("{{{"), Err(RelayError::Decode(_))));
        match a.handle_text(r#"{"type":"wave","videoId":1}"#) {
            Err(RelayError::Decode(e)) => assert!(e.is_unknown_type()),
            other => panic!("Expected unknown type, got {:?}", other),
        }
        assert_eq!(a.phase(), &Phase::Connected);
        assert!(next_json(&mut a_rx).is_none());
    }

    #[test]
    fn test_close_releases_membership() {
        let rooms = RoomRegistry::new();
        let (mut a, _a_rx) = connect(&rooms);
        a.handle_text(r#"{"type":"join","videoId":"abc","userId":"t1"}"#).unwrap();
        assert_eq!(rooms.connection_count(), 1);

        a.close();
        a.close();
        assert_eq!(a.phase(), &Phase::Closed);
        assert_eq!(rooms.room_count(), 0);

        // Frames after close are ignored
        a.handle_text(r#"{"type":"join","videoId":"abc","userId":"t1"}"#).unwrap();
        assert_eq!(rooms.room_count(), 0);
    }
}
