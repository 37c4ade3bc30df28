//! Euclid's Window web server
//!
//! Run with: cargo run -p euclid-web

use std::time::Duration;

use euclid_common::Settings;
use euclid_web::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    // Initialise structured logging; `server.debug` lowers the default level
    let default_filter = if settings.server.debug {
        "euclid_web=debug,euclid_tutor=debug,info"
    } else {
        "euclid_web=info,euclid_tutor=info,info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    info!(
        data_dir = %settings.paths.data_dir.display(),
        static_dir = %settings.paths.static_dir.display(),
        local_ai = settings.local_ai.enabled,
        "Settings loaded"
    );

    info!(version = %settings.server.app_version, "Starting {}", settings.server.app_name);

    let bind = settings.server.bind.clone();
    let state = AppState::from_settings(settings).await?;
    let _upkeep = state.metrics.spawn_upkeep(Duration::from_secs(60));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
