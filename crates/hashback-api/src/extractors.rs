//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers that turn
//! axum's JSON rejections into the error shape each endpoint speaks.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

use hashback_core::RequestError;
use hashback_issuer::{ExchangeStage, Rejection};

use crate::error::AppError;

/// Request types that check their fields beyond what serde deserialization does.
///
/// Validation consumes the raw DTO and yields the typed value handlers use,
/// so a field is never parsed twice.
pub trait Validate {
    /// The checked form.
    type Valid;

    /// Check business rules. Returns the client-facing message on failure.
    fn validate(self) -> Result<Self::Valid, String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T::Valid, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::BadRequest)
}

/// Extract a verification request body.
///
/// Anything that is not a JSON object is refused as a [`Rejection`] so the
/// Caller always receives an incident id.
pub fn extract_exchange_body(result: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    match result {
        Ok(Json(value @ Value::Object(_))) => Ok(value),
        Ok(_) => Err(not_an_object("body is not a JSON object")),
        Err(err) => Err(not_an_object(&err.body_text())),
    }
}

fn not_an_object(detail: &str) -> AppError {
    let rejection = Rejection::new(ExchangeStage::Parsed, RequestError::NotAnObject.to_string());
    tracing::warn!(
        incident_id = %rejection.incident_id_text(),
        stage = %rejection.stage,
        detail,
        "verification request rejected"
    );
    AppError::Rejected(rejection)
}
