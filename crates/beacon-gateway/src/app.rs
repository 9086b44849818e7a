use axum::{routing::get, Router};
use beacon_core::config::BeaconConfig;
use beacon_counter::{CounterStore, FileCounter};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::http::pages::BUNDLED_TEMPLATES_DIR;
use crate::publisher::EventPublisher;
use crate::sse::{broadcast::EventBroadcaster, registry::SubscriptionRegistry};

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    /// Every open /events connection, keyed by subscriber identity.
    pub registry: Arc<SubscriptionRegistry>,
    pub publisher: EventPublisher,
    /// SSE keep-alive comment cadence; `None` when disabled.
    pub keep_alive: Option<Duration>,
    pub templates_dir: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// State backed by the counter file named in the config.
    pub fn new(config: &BeaconConfig) -> Self {
        let store = FileCounter::new(&config.counter.path);
        Self::with_store(config, Box::new(store))
    }

    pub fn with_store(config: &BeaconConfig, store: Box<dyn CounterStore>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new(config.stream.channel_capacity));
        let broadcaster = EventBroadcaster::new(Arc::clone(&registry));
        let keep_alive = match config.stream.keep_alive_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            registry,
            publisher: EventPublisher::new(store, broadcaster),
            keep_alive,
            templates_dir: config
                .templates
                .dir
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(BUNDLED_TEMPLATES_DIR)),
            started_at: Utc::now(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/events", get(crate::sse::connection::events_handler))
        .route(
            "/generate",
            get(crate::http::pages::generator_page).post(crate::http::publish::generate_handler),
        )
        .route("/display", get(crate::http::pages::display_page))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
