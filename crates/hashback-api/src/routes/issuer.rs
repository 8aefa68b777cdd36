//! # Issuer Endpoint
//!
//! `POST /issuer` runs one verification exchange. The engine performs
//! blocking network I/O, so each exchange runs on tokio's blocking pool.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::Value;

use hashback_issuer::ExchangeResponse;

use crate::error::AppError;
use crate::extractors::extract_exchange_body;
use crate::middleware::metrics::ApiMetrics;
use crate::routes::found;
use crate::state::AppState;

/// Build the issuer router.
pub fn router() -> Router<AppState> {
    Router::new().route("/issuer", get(documentation).post(exchange))
}

/// GET /issuer: browsers are sent to the protocol documentation.
async fn documentation(State(state): State<AppState>) -> Response {
    found(&state.config.docs_url)
}

/// POST /issuer: verify the Caller and issue a token.
async fn exchange(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let outcome = match extract_exchange_body(body) {
        Ok(request) => {
            let engine = Arc::clone(&state.engine);
            tokio::task::spawn_blocking(move || engine.handle_json(&request))
                .await?
                .map_err(AppError::from)
        }
        Err(err) => Err(err),
    };
    metrics.record_exchange(outcome.is_ok());

    Ok(into_http(outcome?))
}

fn into_http(response: ExchangeResponse) -> Response {
    match response {
        ExchangeResponse::BearerToken(token) => Json(token.bearer_body()).into_response(),
        ExchangeResponse::Jwt(token) => Json(token.jwt).into_response(),
        ExchangeResponse::SetCookie(token) => (
            StatusCode::NO_CONTENT,
            [(header::SET_COOKIE, token.cookie_header())],
        )
            .into_response(),
    }
}
