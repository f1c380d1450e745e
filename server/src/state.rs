use crate::config::{Heartbeat, RelayConfig};
use crate::rooms::RoomRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Video rooms and their live connections
    pub rooms: RoomRegistry,
    /// Server ping schedule, if enabled
    pub heartbeat: Option<Heartbeat>,
    /// Largest accepted inbound frame
    pub max_message_bytes: usize,
}

impl AppState {
    pub fn new(relay: &RelayConfig) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            heartbeat: relay.heartbeat(),
            max_message_bytes: relay.max_message_bytes,
        }
    }
}
