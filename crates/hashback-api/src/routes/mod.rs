//! # API Route Modules
//!
//! - `issuer`: the open Issuer endpoint that runs verification exchanges.
//! - `hashes`: a replay-guarded hash hosting service for Callers without
//!   a website of their own.

pub mod hashes;
pub mod issuer;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use url::Url;

/// `302 Found` pointing at `location`.
pub(crate) fn found(location: &Url) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.as_str().to_owned())],
    )
        .into_response()
}
