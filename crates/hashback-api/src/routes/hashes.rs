//! # Hash Hosting Service
//!
//! Lets a Caller without its own website publish a verification hash.
//! `POST /hashes` stores `{ID, Hash}`; `GET /hashes?ID=…` returns the hash
//! once and burns the ID. Meant for testing HashBack implementations only.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use hashback_core::encoding::{decode_256_bits, to_base64};
use hashback_store::StoredHash;

use crate::error::{id_in_use, AppError};
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::found;
use crate::state::AppState;

const ACKNOWLEDGEMENT: &str = "This is an open hash service for testing HashBack implementations\r\n\
only. It is not suitable for production use, indeed not for any\r\n\
purpose that requires security. You should instead be using your\r\n\
own website where only you have control over what files are published.\r\n\
\r\n\
Regards, the HashBack demo service. \u{1F989}\r\n";

/// Body of `POST /hashes`.
#[derive(Debug, Deserialize)]
pub struct AddHashRequest {
    #[serde(rename = "ID", default)]
    pub id: Option<Value>,
    #[serde(rename = "Hash", default)]
    pub hash: Option<Value>,
}

/// A checked [`AddHashRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHash {
    pub id: Uuid,
    pub hash: [u8; 32],
}

impl Validate for AddHashRequest {
    type Valid = NewHash;

    fn validate(self) -> Result<NewHash, String> {
        let id = self
            .id
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| "ID property is not a valid UUID.".to_string())?;
        let hash = self
            .hash
            .as_ref()
            .and_then(Value::as_str)
            .and_then(decode_256_bits)
            .ok_or_else(|| "Hash must be 256 bits of BASE64.".to_string())?;
        Ok(NewHash { id, hash })
    }
}

/// Build the hashes router.
pub fn router() -> Router<AppState> {
    Router::new().route("/hashes", get(take_hash).post(add_hash))
}

/// GET /hashes: return a stored hash once.
async fn take_hash(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let Some(raw) = params
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("id"))
        .map(|(_, v)| v)
    else {
        return Ok(found(&state.config.docs_url));
    };

    let id = Uuid::parse_str(raw)
        .map_err(|_| AppError::BadRequest("Value of ID is not a valid UUID.".to_string()))?;
    let stored = state
        .hashes
        .load(&id)
        .ok_or_else(|| AppError::BadRequest(format!("No hash stored with ID \"{id}\".")))?;

    tracing::debug!(%id, "hosted hash collected");
    Ok((
        [
            ("content-type", "text/plain; charset=us-ascii".to_string()),
            ("x-sender-ip", stored.sender_ip.to_string()),
            ("x-sent-at", stored.sent_at.to_string()),
        ],
        format!("{}\r\n", to_base64(&stored.hash)),
    )
        .into_response())
}

/// POST /hashes: store a hash for one later collection.
async fn add_hash(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<AddHashRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let new = extract_validated_json(body)?;
    let sender_ip = sender_ip(connect_info.map(|ConnectInfo(addr)| addr.ip()), &headers);

    let stored = StoredHash {
        hash: new.hash,
        sender_ip,
        sent_at: state.clock.now_unix(),
    };
    state
        .hashes
        .store(new.id, stored)
        .map_err(|err| id_in_use(&new.id, err))?;

    tracing::info!(id = %new.id, sender = %sender_ip, "hash stored");
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ACKNOWLEDGEMENT,
    )
        .into_response())
}

/// The submitter's address.
///
/// A loopback peer is a local reverse proxy; the last `X-Forwarded-For`
/// entry is the address it saw. An unknown peer is recorded as
/// `255.255.255.255`.
fn sender_ip(peer: Option<IpAddr>, headers: &HeaderMap) -> IpAddr {
    let peer = peer.unwrap_or(IpAddr::V4(Ipv4Addr::BROADCAST));
    if !peer.is_loopback() {
        return peer;
    }
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .last()
        .and_then(|entry| entry.trim().parse().ok())
        .unwrap_or(peer)
}
