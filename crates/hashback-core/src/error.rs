//! # Error Types
//!
//! Errors raised while turning an inbound JSON body into a
//! [`VerificationRequest`](crate::VerificationRequest) and while producing
//! its canonical bytes. The `Display` text of [`RequestError`] is sent back to
//! the Caller verbatim, so every message names the offending property.

use thiserror::Error;

use crate::request::ProtocolVersion;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A Caller request that could not be parsed.
///
/// Parsing stops at the first problem; errors are never aggregated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request body was valid JSON but not a JSON object.
    #[error("Request body must be a JSON object.")]
    NotAnObject,

    /// A required property was absent or null.
    #[error("Request is missing required {0} property.")]
    MissingField(&'static str),

    /// A property was present with the wrong JSON type or an unrepresentable value.
    #[error("Request has invalid {0} property.")]
    InvalidField(&'static str),

    /// The version tag is not one this implementation knows.
    #[error(
        "Unknown HashBack version. We only know \"{}\" and \"{}\".",
        ProtocolVersion::Draft3_0.tag(),
        ProtocolVersion::Draft3_1.tag()
    )]
    UnknownVersion(String),
}
