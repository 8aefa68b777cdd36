//! # Exchange Outcomes
//!
//! An exchange ends in exactly one of two tagged values: an
//! [`ExchangeResponse`] carrying a signed token shaped for the requested
//! response type, or a [`Rejection`] carrying a Caller-facing message, a
//! fresh incident id, and optionally a hint for what would have been
//! accepted.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use hashback_core::temporal::http_date;
use hashback_core::ResponseType;

/// Checkpoints of a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeStage {
    /// The body was parsed into a request.
    Parsed,
    /// The protocol version is supported.
    VersionChecked,
    /// Response type, issuer, clock, nonce, rounds and URL all passed.
    PolicyChecked,
    /// The published hash was downloaded.
    HashFetched,
    /// The published hash matched the recomputed one.
    Compared,
    /// A token was issued.
    Issued,
    /// Terminal failure.
    Rejected,
}

impl ExchangeStage {
    /// Lower-case name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::VersionChecked => "version_checked",
            Self::PolicyChecked => "policy_checked",
            Self::HashFetched => "hash_fetched",
            Self::Compared => "compared",
            Self::Issued => "issued",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the Issuer would have accepted instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Supported version tags.
    Versions(Vec<&'static str>),
    /// The nearest acceptable `Rounds`.
    Rounds(i32),
    /// Supported response types.
    TypesOfResponse(Vec<&'static str>),
}

/// A refused exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Human-readable reason, returned verbatim.
    pub message: String,
    /// Correlates the response with server logs.
    pub incident_id: Uuid,
    /// Optional acceptable alternative.
    pub advisory: Option<Advisory>,
    /// The checkpoint at which the exchange failed.
    pub stage: ExchangeStage,
}

impl Rejection {
    /// A rejection at `stage` with a fresh incident id.
    pub fn new(stage: ExchangeStage, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            incident_id: Uuid::new_v4(),
            advisory: None,
            stage,
        }
    }

    /// Attach an advisory.
    pub fn with_advisory(mut self, advisory: Advisory) -> Self {
        self.advisory = Some(advisory);
        self
    }

    /// The incident id as upper-case hyphenated text.
    pub fn incident_id_text(&self) -> String {
        self.incident_id.hyphenated().to_string().to_uppercase()
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (incident {})", self.message, self.incident_id_text())
    }
}

impl Serialize for Rejection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.advisory.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("Message", &self.message)?;
        map.serialize_entry("IncidentID", &self.incident_id_text())?;
        match &self.advisory {
            Some(Advisory::Versions(v)) => map.serialize_entry("AcceptVersions", v)?,
            Some(Advisory::Rounds(r)) => map.serialize_entry("AcceptRounds", r)?,
            Some(Advisory::TypesOfResponse(t)) => map.serialize_entry("AcceptTypeOfResponse", t)?,
            None => {}
        }
        map.end()
    }
}

/// A signed token and its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Compact JWT.
    pub jwt: String,
    /// Issue time, Unix seconds.
    pub issued_at: i64,
    /// Expiry time, Unix seconds.
    pub expires_at: i64,
}

impl IssuedToken {
    /// Seconds the token remains valid.
    pub fn lifespan_secs(&self) -> i64 {
        self.expires_at - self.issued_at
    }

    /// `Set-Cookie` value carrying this token.
    pub fn cookie_header(&self) -> String {
        let mut cookie = format!("HashBack={}; Path=/; Max-Age={}", self.jwt, self.lifespan_secs());
        if let Some(expires) = http_date(self.expires_at) {
            cookie.push_str("; Expires=");
            cookie.push_str(&expires);
        }
        cookie.push_str("; Secure; HttpOnly");
        cookie
    }

    /// JSON body for a `BearerToken` response.
    pub fn bearer_body(&self) -> BearerTokenBody<'_> {
        BearerTokenBody {
            bearer_token: &self.jwt,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

/// `{"BearerToken": …, "IssuedAt": …, "ExpiresAt": …}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BearerTokenBody<'a> {
    /// The token.
    pub bearer_token: &'a str,
    /// Issue time, Unix seconds.
    pub issued_at: i64,
    /// Expiry time, Unix seconds.
    pub expires_at: i64,
}

/// A successful exchange, shaped by the requested response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeResponse {
    /// JSON object with the token and timestamps.
    BearerToken(IssuedToken),
    /// The token as a JSON string.
    Jwt(IssuedToken),
    /// 204 with the token in a cookie.
    SetCookie(IssuedToken),
}

impl ExchangeResponse {
    /// Wrap `token` for `kind`.
    pub fn shaped(kind: ResponseType, token: IssuedToken) -> Self {
        match kind {
            ResponseType::BearerToken => Self::BearerToken(token),
            ResponseType::Jwt => Self::Jwt(token),
            ResponseType::SetCookie => Self::SetCookie(token),
        }
    }

    /// The issued token.
    pub fn token(&self) -> &IssuedToken {
        match self {
            Self::BearerToken(t) | Self::Jwt(t) | Self::SetCookie(t) => t,
        }
    }

    /// The response type this value was shaped for.
    pub fn response_type(&self) -> ResponseType {
        match self {
            Self::BearerToken(_) => ResponseType::BearerToken,
            Self::Jwt(_) => ResponseType::Jwt,
            Self::SetCookie(_) => ResponseType::SetCookie,
        }
    }
}
