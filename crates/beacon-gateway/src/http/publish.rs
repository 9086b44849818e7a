//! Event trigger endpoint — POST /generate
//!
//! No body required. Each call records exactly one event: the persisted
//! counter goes up by one and the new value is pushed to every subscriber.
//! Returns an empty 200, or 500 when the counter cannot be read or written
//! (nothing is broadcast in that case).

use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::app::AppState;
use crate::error::GatewayError;

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, GatewayError> {
    state.publisher.trigger().await?;
    Ok(StatusCode::OK)
}
