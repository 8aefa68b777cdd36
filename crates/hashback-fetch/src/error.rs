//! # Fetch Errors
//!
//! Every variant renders a human-readable reason. The Issuer passes that
//! text back to the Caller, so messages describe what the remote end did
//! and never include local paths or internal state.

use std::io;
use std::net::IpAddr;

use rustls::pki_types::CertificateDer;
use thiserror::Error;

/// Failure to retrieve a verification hash.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Only `http` and `https` URLs can be fetched.
    #[error("Cannot fetch {0} URLs.")]
    UnsupportedScheme(String),

    /// The URL has no host component.
    #[error("URL has no host.")]
    MissingHost,

    /// Name resolution found no address for the host.
    #[error("No such host at {0}.")]
    NoSuchHost(String),

    /// Name resolution failed for a reason other than a missing host.
    #[error("Could not look up {host}: {reason}")]
    Resolve {
        /// Host being fetched.
        host: String,
        /// Resolver's description of the failure.
        reason: String,
    },

    /// An observer refused the resolved address.
    #[error("Refused to connect to {host} at {address}: {reason}")]
    Vetoed {
        /// Host being fetched.
        host: String,
        /// The address that was refused.
        address: IpAddr,
        /// Observer's explanation.
        reason: String,
    },

    /// TCP connection could not be established.
    #[error("Could not connect to {host}: {source}")]
    Connect {
        /// Host being fetched.
        host: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// The TLS handshake failed or the certificate was rejected.
    ///
    /// Carries the peer certificate when one was presented, so callers can
    /// audit what the server offered even though the fetch failed.
    #[error("TLS handshake with {host} failed: {reason}")]
    Tls {
        /// Host being fetched.
        host: String,
        /// Handshake failure description.
        reason: String,
        /// End-entity certificate captured during the handshake, if any.
        certificate: Option<CertificateDer<'static>>,
    },

    /// A read or connect step ran out of time.
    #[error("Timed out waiting for {0}.")]
    Timeout(String),

    /// Socket error after the connection was established.
    #[error("Error talking to {host}: {source}")]
    Io {
        /// Host being fetched.
        host: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// The response arrived but was not an acceptable verification hash.
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl FetchError {
    /// The certificate observed during a failed handshake, if any.
    pub fn certificate(&self) -> Option<&CertificateDer<'static>> {
        match self {
            Self::Tls { certificate, .. } => certificate.as_ref(),
            _ => None,
        }
    }
}

/// A structurally unacceptable HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// Nothing was received.
    #[error("HTTP response did not include the status line.")]
    MissingStatusLine,

    /// The first token of the status line is not an HTTP version.
    #[error("Status line did not begin \"HTTP/\".")]
    NotHttp,

    /// The status line stops after the version.
    #[error("Status line did not include a status code.")]
    MissingStatusCode,

    /// The status code is not three digits in 100..=599.
    #[error("Status code must be three digits 100-599.")]
    InvalidStatusCode,

    /// The status code was valid but not 200.
    #[error("Expected HTTP status code 200 from {host}, got {code}.")]
    UnexpectedStatus {
        /// Host being fetched.
        host: String,
        /// Observed status code.
        code: u16,
    },

    /// No header lines followed the status line.
    #[error("HTTP response from {0} did not include any headers.")]
    MissingHeaders(String),

    /// A header line has no `:` separator.
    #[error("Response header without colon.")]
    HeaderWithoutColon,

    /// A folded continuation line appeared before any header.
    #[error("Response header continuation without a preceding header.")]
    OrphanContinuation,

    /// No `Content-Type` header.
    #[error("Response from {0} did not include a Content-Type header.")]
    MissingContentType(String),

    /// `Content-Type` media type was not `text/plain`.
    #[error("Response from {host} has Content-Type \"{content_type}\", expected text/plain.")]
    WrongContentType {
        /// Host being fetched.
        host: String,
        /// The value received.
        content_type: String,
    },

    /// No body line decodes to 256 bits of base64.
    #[error("Response from {0} did not include a 256-bit BASE64 hash.")]
    NoHash(String),
}
