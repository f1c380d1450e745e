use std::time::Duration;
use vidnote_proto::Id;

/// When and how often to retry after the socket drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Fixed delay before each attempt.
    pub interval: Duration,
    /// Attempts allowed between two successful opens.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_millis(3000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay endpoint, e.g. `ws://127.0.0.1:8080/ws`.
    pub url: String,
    /// Room joined automatically on every open. Both ids are required.
    pub video_id: Option<Id>,
    pub user_id: Option<Id>,
    pub reconnect: ReconnectPolicy,
    /// Upper bound on one TCP + WebSocket handshake. Expiry counts as a
    /// failed connect.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            video_id: None,
            user_id: None,
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_room(mut self, video_id: impl Into<Id>, user_id: impl Into<Id>) -> Self {
        self.video_id = Some(video_id.into());
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}
