use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    response::Response,
};
use std::net::SocketAddr;

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. There is no authentication: the relay trusts
/// the `userId` a client puts in its `join` envelope.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::debug!(peer = %peer, "WebSocket upgrade requested");

    let max_message_bytes = state.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .max_frame_size(max_message_bytes)
        .on_upgrade(move |socket| actor::run_connection(socket, state, peer))
}
