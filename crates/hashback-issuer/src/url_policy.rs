//! # VerifyUrl Rules
//!
//! An open Issuer fetches whatever URL a stranger hands it, so the URL is
//! narrowed before any connection is made. Rules apply in order and the
//! first violation is reported:
//!
//! 1. It parses.
//! 2. A URL into this Issuer's own hash store is accepted outright.
//! 3. `https` only.
//! 4. A domain name, never an IP literal.
//! 5. `localhost` only when the Issuer itself is on `localhost`.
//! 6. Port 443 for anything that is not `localhost`.

use thiserror::Error;
use url::{Host, Url};

use crate::policy::IssuerPolicy;

/// A `VerifyUrl` this Issuer refuses to fetch.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyUrlViolation {
    /// Not a parseable absolute URL.
    #[error("VerifyUrl is not a valid URL.")]
    Invalid,

    /// Scheme other than `https`.
    #[error("VerifyUrl is not HTTPS.")]
    NotHttps,

    /// Host is an IPv4 or IPv6 literal.
    #[error("VerifyUrl must not use an IP address.")]
    IpAddress,

    /// Host is `localhost` on a non-local Issuer.
    #[error("VerifyUrl must not be localhost.")]
    Localhost,

    /// Port other than 443.
    #[error("VerifyUrl must use port 443.")]
    NonStandardPort,
}

/// Whether `url` addresses this Issuer's own hash store.
pub fn is_own_hash_store(url: &Url, policy: &IssuerPolicy) -> bool {
    policy.is_same_origin(url)
        && url.path() == policy.hash_store_path()
        && url
            .query()
            .and_then(|q| q.get(..3))
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("ID="))
}

/// Parse `raw` and check it against the fetch rules.
pub fn check_verify_url(raw: &str, policy: &IssuerPolicy) -> Result<Url, VerifyUrlViolation> {
    let url = Url::parse(raw).map_err(|_| VerifyUrlViolation::Invalid)?;

    if is_own_hash_store(&url, policy) {
        return Ok(url);
    }

    if url.scheme() != "https" {
        return Err(VerifyUrlViolation::NotHttps);
    }

    let is_localhost = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => return Err(VerifyUrlViolation::IpAddress),
        None => return Err(VerifyUrlViolation::Invalid),
    };

    if is_localhost {
        if !policy.is_local_root() {
            return Err(VerifyUrlViolation::Localhost);
        }
    } else if url.port_or_known_default() != Some(443) {
        return Err(VerifyUrlViolation::NonStandardPort);
    }

    Ok(url)
}
