//! Wire protocol shared by the VidNote relay server and its clients.
//!
//! Every frame is a JSON text message tagged by a `type` field. Field names
//! are camelCase on the wire.

pub mod codec;
pub mod envelope;
pub mod id;

pub use codec::{decode, encode, DecodeError};
pub use envelope::{ClientEnvelope, Envelope, ServerEnvelope};
pub use id::Id;

/// Path the relay serves its WebSocket upgrade on.
pub const WS_PATH: &str = "/ws";
