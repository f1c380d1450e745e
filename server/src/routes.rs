use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;
use crate::ws::handler as ws_handler;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub rooms: usize,
    pub connections: usize,
}

/// Build the axum Router with the relay endpoint and health check.
pub fn build_router(state: AppState) -> Router {
    // WebSocket endpoint (no auth; the relay trusts client-supplied ids)
    let ws_routes = Router::new().route(vidnote_proto::WS_PATH, get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// GET /health: liveness plus current room occupancy.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        rooms: state.rooms.room_count(),
        connections: state.rooms.connection_count(),
    })
}
