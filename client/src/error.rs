use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Transport-level failures surfaced to the UI through
/// [`RelayHandler::on_error`](crate::RelayHandler::on_error).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to real-time service: {0}")]
    Connect(#[source] tungstenite::Error),

    #[error("timed out connecting to real-time service after {0:?}")]
    ConnectTimeout(Duration),

    #[error("lost connection to real-time service: {0}")]
    Transport(#[source] tungstenite::Error),

    #[error("gave up reconnecting to real-time service after {0} attempts")]
    ReconnectExhausted(u32),
}
