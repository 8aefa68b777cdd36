//! # hashback-api: HTTP Service for the HashBack Exchange
//!
//! Hosts an open Issuer and a hash hosting service for Callers that have
//! no website of their own.
//!
//! ## API Surface
//!
//! | Path                | Module               | Purpose                     |
//! |---------------------|----------------------|-----------------------------|
//! | `/`                 | this module          | redirect to project home    |
//! | `/issuer`           | [`routes::issuer`]   | verification exchange       |
//! | `/hashes`           | [`routes::hashes`]   | publish and collect hashes  |
//! | `/health/*`         | this module          | liveness and readiness      |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with fresh metrics.
pub fn app(state: AppState) -> Router {
    app_with_metrics(state, ApiMetrics::new())
}

/// Assemble the application router, counting into `metrics`.
pub fn app_with_metrics(state: AppState, metrics: ApiMetrics) -> Router {
    let api = Router::new()
        .route("/", get(home))
        .merge(routes::issuer::router())
        .merge(routes::hashes::router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api)
}

/// GET /: send visitors to the project home page.
async fn home(State(state): State<AppState>) -> Response {
    routes::found(&state.config.home_url)
}

/// Liveness probe. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
