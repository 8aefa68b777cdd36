//! # Fetched Artifact

use std::net::IpAddr;

use rustls::pki_types::CertificateDer;

use crate::error::FetchError;
use crate::http::parse_verification_response;

/// Everything learned from one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    /// The address actually connected to.
    pub address: IpAddr,
    /// Server certificate, for `https` fetches.
    pub certificate: Option<CertificateDer<'static>>,
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Body text.
    pub body: String,
    /// The published 256-bit hash.
    pub hash: [u8; 32],
}

impl FetchedArtifact {
    /// Validate raw response bytes received from `host` at `address`.
    pub fn from_response_bytes(
        host: &str,
        address: IpAddr,
        certificate: Option<CertificateDer<'static>>,
        bytes: &[u8],
    ) -> Result<Self, FetchError> {
        let response = parse_verification_response(host, bytes)?;
        Ok(Self {
            address,
            certificate,
            status: response.status,
            headers: response.headers,
            body: response.body,
            hash: response.hash,
        })
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
