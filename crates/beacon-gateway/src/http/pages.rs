use axum::{extract::State, response::Html};
use std::sync::Arc;

use crate::app::AppState;
use crate::error::GatewayError;

pub const GENERATOR_PAGE: &str = "generator.html";
pub const DISPLAY_PAGE: &str = "display.html";
/// Pages shipped with the gateway, used when `templates.dir` is unset.
pub const BUNDLED_TEMPLATES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

/// Load a static page from the templates directory. Read per request so
/// edits show up without a restart.
async fn render_page(state: &AppState, name: &str) -> Result<Html<String>, GatewayError> {
    let path = state.templates_dir.join(name);
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|source| GatewayError::Template {
            name: name.to_string(),
            source,
        })
}

/// GET /generate — page with the button that records an event.
pub async fn generator_page(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, GatewayError> {
    render_page(&state, GENERATOR_PAGE).await
}

/// GET /display — page that listens on /events and shows the latest value.
pub async fn display_page(State(state): State<Arc<AppState>>) -> Result<Html<String>, GatewayError> {
    render_page(&state, DISPLAY_PAGE).await
}
