//! # Host Resolution and Address Selection
//!
//! Name lookup is a trait so tests and embedders can pin hosts to chosen
//! addresses. After lookup the candidate list is narrowed to one family
//! (IPv6 wins when both are present) and one address is chosen by an
//! [`AddressSelector`].

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Resolves a host name to candidate addresses.
pub trait HostResolver: Send + Sync {
    /// All addresses for `host`.
    ///
    /// An empty list or an error of kind [`io::ErrorKind::NotFound`] means the
    /// host does not exist. Any other error is a failed lookup.
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// The operating system's resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let found = (host, 0).to_socket_addrs().map_err(|e| {
            if is_missing_host(&e) {
                io::Error::new(io::ErrorKind::NotFound, e.to_string())
            } else {
                e
            }
        })?;
        let mut out: Vec<IpAddr> = Vec::new();
        for addr in found {
            if !out.contains(&addr.ip()) {
                out.push(addr.ip());
            }
        }
        Ok(out)
    }
}

/// Whether a system lookup error says the name does not exist.
///
/// The standard library reports every resolver failure with the same kind,
/// so the resolver's own message (or the Windows error code) decides.
fn is_missing_host(error: &io::Error) -> bool {
    const WSAHOST_NOT_FOUND: i32 = 11001;
    const WSANO_DATA: i32 = 11004;
    if cfg!(windows) && matches!(error.raw_os_error(), Some(WSAHOST_NOT_FOUND | WSANO_DATA)) {
        return true;
    }
    let text = error.to_string();
    [
        "Name or service not known",
        "No address associated with hostname",
        "nodename nor servname provided, or not known",
    ]
    .iter()
    .any(|needle| text.contains(needle))
}

/// Fixed host table. Unknown hosts resolve to nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<String, Vec<IpAddr>>,
    failures: HashMap<String, io::ErrorKind>,
}

impl StaticResolver {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `host` (case-insensitive) to `addresses`.
    pub fn with_host(mut self, host: &str, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        self.table
            .insert(host.to_ascii_lowercase(), addresses.into_iter().collect());
        self
    }

    /// Make lookups of `host` fail with `kind`.
    pub fn with_failure(mut self, host: &str, kind: io::ErrorKind) -> Self {
        self.failures.insert(host.to_ascii_lowercase(), kind);
        self
    }
}

impl HostResolver for StaticResolver {
    fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Some(kind) = self.failures.get(&host.to_ascii_lowercase()) {
            return Err(io::Error::new(*kind, format!("lookup of {host} failed")));
        }
        Ok(self
            .table
            .get(&host.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

/// Keep only IPv6 addresses when the list mixes families.
pub fn prefer_newer_family(addresses: Vec<IpAddr>) -> Vec<IpAddr> {
    if addresses.iter().any(IpAddr::is_ipv6) {
        addresses.into_iter().filter(IpAddr::is_ipv6).collect()
    } else {
        addresses
    }
}

/// Chooses one of `count` candidate addresses.
pub trait AddressSelector: Send + Sync {
    /// An index; values at or past `count` wrap.
    fn select(&self, count: usize) -> usize;
}

/// Round-robin across calls, shared by every fetch made through one client.
#[derive(Debug, Default)]
pub struct RotatingSelector {
    next: AtomicUsize,
}

impl RotatingSelector {
    /// Start rotating from `index`.
    pub fn starting_at(index: usize) -> Self {
        Self {
            next: AtomicUsize::new(index),
        }
    }
}

impl AddressSelector for RotatingSelector {
    fn select(&self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        self.next.fetch_add(1, Ordering::Relaxed) % count
    }
}
