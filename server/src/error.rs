use thiserror::Error;
use vidnote_proto::{DecodeError, Id};

/// Reasons an inbound frame was dropped without effect.
///
/// None of these are reported to the peer; the protocol has no error
/// envelope. The connection stays open.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("connection is not joined to room {0}")]
    NotInRoom(Id),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}
