use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health — liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("BEACON_GIT_SHA"),
        "subscribers": state.publisher.broadcaster().subscriber_count(),
        "queue_capacity": state.registry.capacity(),
        "dropped_messages": state.registry.dropped_total(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}
