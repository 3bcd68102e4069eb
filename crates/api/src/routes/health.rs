//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use realtime::{ConnectionState, RealtimeTransport};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub realtime: ConnectionState,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        realtime: state.hub.state(),
    })
}
