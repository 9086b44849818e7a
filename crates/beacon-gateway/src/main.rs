use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod error;
mod http;
mod publisher;
mod sse;

use sse::registry::SubscriptionRegistry;

/// Real-time event counter: POST /generate records an event, GET /events streams it.
#[derive(Debug, Parser)]
#[command(name = "beacon-gateway", version)]
struct Args {
    /// Path to beacon.toml (falls back to BEACON_CONFIG, then ./beacon.toml).
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen port from the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // load config: --config > BEACON_CONFIG env > ./beacon.toml
    let config_path = args.config.or_else(|| std::env::var("BEACON_CONFIG").ok());
    let mut config = beacon_core::config::BeaconConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            warn!(code = e.code(), "Config load failed ({}), using defaults", e);
            beacon_core::config::BeaconConfig::default()
        });
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let state = Arc::new(app::AppState::new(&config));
    info!(
        counter = %config.counter.path,
        templates = %state.templates_dir.display(),
        queue_capacity = config.stream.channel_capacity,
        "configuration ready"
    );
    let router = app::build_router(Arc::clone(&state));

    let addr: SocketAddr = config.listen_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Beacon gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state.registry)))
        .await?;

    info!("Beacon gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then close every subscriber queue so the
/// open event streams end and graceful shutdown can finish.
async fn shutdown_signal(registry: Arc<SubscriptionRegistry>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, closing event streams");
    registry.close_all();
}
