//! # Token Issuance
//!
//! Assembles a compact HS256 JWT:
//!
//! ```text
//! base64url({"typ":"JWT","alg":"HS256"}) . base64url(claims) . base64url(HMAC-SHA256)
//! ```
//!
//! Claims are `iss`, `sub`, `iat`, `exp` and a literal
//! `"this-token-is-trustworthy": false`, serialized compactly in that order.
//!
//! ## Demo key
//!
//! [`DEMO_SIGNING_KEY`] is a published placeholder and is **not safe for
//! production**: anyone can mint tokens with it. Deployments construct a
//! [`TokenSigner`] from their own provisioned secret.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use hashback_core::encoding::to_base64url;

use crate::error::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// The publicly known demo HMAC key.
pub const DEMO_SIGNING_KEY: &[u8] = b"your-256-bit-secret";

const HEADER_JSON: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

/// Claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Issuer host.
    pub issuer: String,
    /// Subject host, i.e. the host of the verified URL.
    pub subject: String,
    /// Issue time, Unix seconds.
    pub issued_at: i64,
    /// Expiry time, Unix seconds.
    pub expires_at: i64,
}

impl TokenClaims {
    /// The compact JSON body. Key order is fixed.
    fn to_json(&self) -> String {
        format!(
            r#"{{"iss":{},"sub":{},"iat":{},"exp":{},"this-token-is-trustworthy":false}}"#,
            Value::from(self.issuer.as_str()),
            Value::from(self.subject.as_str()),
            self.issued_at,
            self.expires_at,
        )
    }
}

/// HS256 signer holding a keyed HMAC instance.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    demo: bool,
}

impl TokenSigner {
    /// Create a signer from a secret key.
    pub fn new(key: &[u8]) -> Result<Self, TokenError> {
        if key.is_empty() {
            return Err(TokenError::EmptyKey);
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
        Ok(Self {
            mac,
            demo: key == DEMO_SIGNING_KEY,
        })
    }

    /// Create a signer using [`DEMO_SIGNING_KEY`].
    pub fn demo() -> Result<Self, TokenError> {
        Self::new(DEMO_SIGNING_KEY)
    }

    /// Whether this signer uses the published demo key.
    pub fn is_demo(&self) -> bool {
        self.demo
    }

    /// Produce a signed token for `claims`.
    pub fn sign(&self, claims: &TokenClaims) -> String {
        let header_dot_body = format!(
            "{}.{}",
            to_base64url(HEADER_JSON.as_bytes()),
            to_base64url(claims.to_json().as_bytes())
        );
        let mut mac = self.mac.clone();
        mac.update(header_dot_body.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!("{header_dot_body}.{}", to_base64url(&signature))
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"[REDACTED]")
            .field("demo", &self.demo)
            .finish()
    }
}

/// Build a token signed with the demo key.
pub fn build_signed_token(
    issuer: &str,
    subject: &str,
    issued_at: i64,
    expires_at: i64,
) -> Result<String, TokenError> {
    let signer = TokenSigner::demo()?;
    Ok(signer.sign(&TokenClaims {
        issuer: issuer.to_owned(),
        subject: subject.to_owned(),
        issued_at,
        expires_at,
    }))
}
