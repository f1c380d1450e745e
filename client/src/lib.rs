//! Client for the VidNote comment relay.
//!
//! [`RelayClient`] owns a single outbound WebSocket. On open it joins the
//! configured video room, forwards inbound envelopes to a [`RelayHandler`],
//! and reconnects on unexpected closes according to a [`ReconnectPolicy`].

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod reconnect;

pub use client::{ConnectionState, RelayClient};
pub use config::{ClientConfig, ReconnectPolicy};
pub use error::ClientError;
pub use handler::RelayHandler;
pub use reconnect::Reconnector;
pub use vidnote_proto::{ClientEnvelope, Id, ServerEnvelope};
