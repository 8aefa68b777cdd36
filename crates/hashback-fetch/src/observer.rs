//! # Fetch Observers
//!
//! Hooks invoked at the two points where the peer's identity becomes known:
//! after name resolution and after the TLS certificate arrives. Either hook
//! may veto the fetch by returning a reason.

use std::net::IpAddr;

use rustls::pki_types::CertificateDer;

/// Inspects and optionally vetoes a fetch in progress.
pub trait FetchObserver: Send + Sync {
    /// Called with the address chosen for `host`, before connecting.
    fn on_address_resolved(&self, host: &str, address: IpAddr) -> Result<(), String> {
        let _ = (host, address);
        Ok(())
    }

    /// Called with the end-entity certificate, before it is validated.
    fn on_certificate(&self, host: &str, certificate: &CertificateDer<'_>) -> Result<(), String> {
        let _ = (host, certificate);
        Ok(())
    }
}

/// Refuses addresses that are not reachable on the public internet.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicAddressPolicy;

impl FetchObserver for PublicAddressPolicy {
    fn on_address_resolved(&self, host: &str, address: IpAddr) -> Result<(), String> {
        if is_public_address(address) {
            Ok(())
        } else {
            tracing::warn!(%host, %address, "refusing non-public address");
            Err(format!("{address} is not a public address."))
        }
    }
}

/// Whether `ip` is globally routable.
pub fn is_public_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(a) => {
            let [first, second, ..] = a.octets();
            let shared = first == 100 && (second & 0xc0) == 64;
            !(a.is_private()
                || a.is_loopback()
                || a.is_link_local()
                || a.is_unspecified()
                || a.is_broadcast()
                || a.is_documentation()
                || a.is_multicast()
                || shared)
        }
        IpAddr::V6(a) => {
            if let Some(mapped) = a.to_ipv4_mapped() {
                return is_public_address(IpAddr::V4(mapped));
            }
            let head = a.segments()[0];
            let unique_local = (head & 0xfe00) == 0xfc00;
            let link_local = (head & 0xffc0) == 0xfe80;
            !(a.is_loopback() || a.is_unspecified() || a.is_multicast() || unique_local || link_local)
        }
    }
}
