pub mod actor;
pub mod handler;
pub mod protocol;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use vidnote_proto::{encode, ServerEnvelope};

use crate::error::RelayError;

/// Type alias for the sender half of a WebSocket connection's channel.
/// The room registry holds clones of this to push frames to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Encode and queue an envelope for one connection.
/// A closed channel means the connection is already going away and is ignored.
pub fn send_envelope(tx: &ConnectionSender, envelope: &ServerEnvelope) -> Result<(), RelayError> {
    let text = encode(envelope)?;
    let _ = tx.send(Message::Text(text.into()));
    Ok(())
}
