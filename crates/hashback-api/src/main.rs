//! # hashback-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the Issuer and hash hosting service.
//! Binds to configurable port (default 8080).

use std::net::SocketAddr;

use hashback_api::config::ServiceConfig;
use hashback_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env().map_err(|e| {
        tracing::error!("Configuration failed: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    let port = config.port;
    let state = AppState::from_config(config)?;
    let app = hashback_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("HashBack service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
