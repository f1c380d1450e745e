use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::Id;

/// Common behaviour of both envelope directions.
pub trait Envelope: Serialize + DeserializeOwned {
    /// Every `type` tag this direction understands.
    const KINDS: &'static [&'static str];

    /// The `type` tag of this envelope.
    fn kind(&self) -> &'static str;
}

/// Envelopes sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEnvelope {
    /// Register the sending connection in the room for `video_id`.
    #[serde(rename_all = "camelCase")]
    Join { video_id: Id, user_id: Id },
    /// A comment already persisted by the app, to be pushed to peers.
    #[serde(rename_all = "camelCase")]
    NewComment { video_id: Id, comment: Value },
    #[serde(rename_all = "camelCase")]
    Typing {
        video_id: Id,
        user_id: Id,
        is_typing: bool,
    },
}

impl ClientEnvelope {
    /// The room this envelope targets.
    pub fn video_id(&self) -> &Id {
        match self {
            ClientEnvelope::Join { video_id, .. }
            | ClientEnvelope::NewComment { video_id, .. }
            | ClientEnvelope::Typing { video_id, .. } => video_id,
        }
    }
}

impl Envelope for ClientEnvelope {
    const KINDS: &'static [&'static str] = &["join", "new_comment", "typing"];

    fn kind(&self) -> &'static str {
        match self {
            ClientEnvelope::Join { .. } => "join",
            ClientEnvelope::NewComment { .. } => "new_comment",
            ClientEnvelope::Typing { .. } => "typing",
        }
    }
}

/// Envelopes sent by the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// Join acknowledgement, sent only to the joining connection.
    #[serde(rename_all = "camelCase")]
    Joined { video_id: Id },
    NewComment { comment: Value },
    #[serde(rename_all = "camelCase")]
    Typing { user_id: Id, is_typing: bool },
}

impl Envelope for ServerEnvelope {
    const KINDS: &'static [&'static str] = &["joined", "new_comment", "typing"];

    fn kind(&self) -> &'static str {
        match self {
            ServerEnvelope::Joined { .. } => "joined",
            ServerEnvelope::NewComment { .. } => "new_comment",
            ServerEnvelope::Typing { .. } => "typing",
        }
    }
}
