//! # API Error Types
//!
//! Two families of client error leave this service. The Issuer answers with
//! a JSON [`Rejection`] carrying an incident id; the hash store answers with
//! a single line of plain text. Internal failures are logged and replaced
//! with a generic message.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use hashback_issuer::Rejection;
use hashback_store::StoreError;

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Plain-text client error from the hash store (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Refused verification exchange (400, JSON).
    #[error("rejected: {0}")]
    Rejected(Rejection),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Rejected(_) => (StatusCode::BAD_REQUEST, "REJECTED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match self {
            Self::BadRequest(message) => {
                tracing::debug!(code, %message, "hash store request refused");
                (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    message,
                )
                    .into_response()
            }
            Self::Rejected(rejection) => (status, Json(rejection)).into_response(),
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                (
                    status,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    "An internal error occurred",
                )
                    .into_response()
            }
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("exchange task failed: {err}"))
    }
}

/// The hash store's only refusal on insert is an ID collision.
pub fn id_in_use(id: &uuid::Uuid, err: StoreError) -> AppError {
    match err {
        StoreError::AlreadyInUse => AppError::BadRequest(format!("The ID {id} is already in use.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashback_issuer::ExchangeStage;

    #[test]
    fn bad_request_status_code() {
        let err = AppError::BadRequest("Hash must be 256 bits of BASE64.".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[test]
    fn rejected_status_code() {
        let err = AppError::from(Rejection::new(ExchangeStage::Compared, "Hash mismatch."));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "REJECTED");
    }

    #[test]
    fn internal_status_code() {
        let err = AppError::Internal("boom".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
    }

    #[test]
    fn bad_request_is_plain_text() {
        let response = AppError::BadRequest("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn rejection_is_json() {
        let response = AppError::from(Rejection::new(ExchangeStage::Parsed, "x")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn id_collision_message() {
        let id = uuid::Uuid::nil();
        let err = id_in_use(&id, StoreError::AlreadyInUse);
        assert_eq!(
            err.to_string(),
            "bad request: The ID 00000000-0000-0000-0000-000000000000 is already in use."
        );
    }
}
