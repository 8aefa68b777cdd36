//! # Fetch Client
//!
//! ## Limits
//!
//! | Limit            | Default |
//! |------------------|---------|
//! | connect timeout  | 5 s     |
//! | per-read timeout | 5 s     |
//! | overall deadline | 15 s    |
//! | response bytes   | 64 KiB  |
//!
//! The response is read until the peer closes, the byte limit is reached,
//! or the deadline passes. A response cut short by the byte limit is parsed
//! as-is. Redirects are reported as a non-200 status, never followed.

use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::RootCertStore;
use url::{Host, Url};

use crate::artifact::FetchedArtifact;
use crate::error::FetchError;
use crate::http::build_request;
use crate::observer::FetchObserver;
use crate::resolver::{prefer_newer_family, AddressSelector, HostResolver, RotatingSelector, SystemResolver};
use crate::tls::{self, TlsStream};

/// Retrieves a published verification hash.
pub trait HashFetcher: Send + Sync {
    /// Fetch and validate the hash published at `url`.
    fn fetch(&self, url: &Url) -> Result<FetchedArtifact, FetchError>;
}

/// Timeouts and limits for [`FetchClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Time allowed to establish the TCP connection.
    pub connect_timeout: Duration,
    /// Time allowed for any single read.
    pub read_timeout: Duration,
    /// Time allowed for the whole fetch.
    pub deadline: Duration,
    /// Bytes read before the response is cut off.
    pub max_response_bytes: usize,
    /// Headers sent after the fixed request headers.
    pub request_headers: Vec<(String, String)>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            deadline: Duration::from_secs(15),
            max_response_bytes: 64 * 1024,
            request_headers: vec![("Accept".to_owned(), "text/plain".to_owned())],
        }
    }
}

/// A connection whose read timeout can be narrowed as the deadline nears.
trait Connection: Read + Write {
    fn limit_read_wait(&self, wait: Duration) -> io::Result<()>;
}

impl Connection for TcpStream {
    fn limit_read_wait(&self, wait: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(wait))
    }
}

impl Connection for TlsStream {
    fn limit_read_wait(&self, wait: Duration) -> io::Result<()> {
        self.sock.set_read_timeout(Some(wait))
    }
}

/// One-shot HTTP/1.1 client for verification hashes.
pub struct FetchClient {
    config: FetchConfig,
    resolver: Arc<dyn HostResolver>,
    selector: Arc<dyn AddressSelector>,
    observer: Option<Arc<dyn FetchObserver>>,
    roots: Arc<RootCertStore>,
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("config", &self.config)
            .field("has_observer", &self.observer.is_some())
            .field("trust_anchors", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// A client using the system resolver and the Mozilla trust anchors.
    pub fn new() -> Self {
        Self {
            config: FetchConfig::default(),
            resolver: Arc::new(SystemResolver),
            selector: Arc::new(RotatingSelector::default()),
            observer: None,
            roots: tls::default_root_store(),
        }
    }

    /// Replace the limits.
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the host resolver.
    pub fn with_resolver(mut self, resolver: impl HostResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Replace the address selector.
    pub fn with_selector(mut self, selector: impl AddressSelector + 'static) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Install an observer that may veto addresses and certificates.
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Trust these anchors instead of the defaults.
    pub fn with_root_store(mut self, roots: RootCertStore) -> Self {
        self.roots = Arc::new(roots);
        self
    }

    /// Current limits.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn choose_address(&self, url: &Url, host: &str) -> Result<IpAddr, FetchError> {
        let candidates = match url.host() {
            Some(Host::Domain(domain)) => self.resolver.resolve(domain).map_err(|e| {
                tracing::debug!(%host, error = %e, "host lookup failed");
                if e.kind() == io::ErrorKind::NotFound {
                    FetchError::NoSuchHost(host.to_owned())
                } else {
                    FetchError::Resolve {
                        host: host.to_owned(),
                        reason: e.to_string(),
                    }
                }
            })?,
            Some(Host::Ipv4(a)) => vec![IpAddr::V4(a)],
            Some(Host::Ipv6(a)) => vec![IpAddr::V6(a)],
            None => return Err(FetchError::MissingHost),
        };

        let candidates = prefer_newer_family(candidates);
        if candidates.is_empty() {
            return Err(FetchError::NoSuchHost(host.to_owned()));
        }
        let index = self.selector.select(candidates.len()) % candidates.len();
        Ok(candidates[index])
    }

    fn exchange<C: Connection>(
        &self,
        conn: &mut C,
        host: &str,
        request: &[u8],
        deadline: Instant,
    ) -> Result<Vec<u8>, FetchError> {
        let io_error = |source: io::Error| {
            if matches!(source.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) {
                FetchError::Timeout(host.to_owned())
            } else {
                FetchError::Io {
                    host: host.to_owned(),
                    source,
                }
            }
        };

        conn.write_all(request).map_err(io_error)?;
        conn.flush().map_err(io_error)?;

        let mut buffer = vec![0u8; self.config.max_response_bytes];
        let mut filled = 0;
        while filled < buffer.len() {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero())
                .ok_or_else(|| FetchError::Timeout(host.to_owned()))?;
            conn.limit_read_wait(remaining.min(self.config.read_timeout))
                .map_err(io_error)?;

            match conn.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                // Peers that drop TLS without close_notify still delivered a full response.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(io_error(e)),
            }
        }
        if filled == buffer.len() {
            tracing::debug!(%host, limit = filled, "response truncated at byte limit");
        }
        buffer.truncate(filled);
        Ok(buffer)
    }
}

impl HashFetcher for FetchClient {
    fn fetch(&self, url: &Url) -> Result<FetchedArtifact, FetchError> {
        let deadline = Instant::now() + self.config.deadline;
        let secure = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(FetchError::UnsupportedScheme(other.to_owned())),
        };
        let host = url.host_str().ok_or(FetchError::MissingHost)?.to_owned();
        let port = url.port_or_known_default().ok_or(FetchError::MissingHost)?;

        let address = self.choose_address(url, &host)?;
        if let Some(observer) = &self.observer {
            observer
                .on_address_resolved(&host, address)
                .map_err(|reason| FetchError::Vetoed {
                    host: host.clone(),
                    address,
                    reason,
                })?;
        }

        tracing::debug!(%host, %address, port, secure, "connecting for verification hash");
        let tcp = TcpStream::connect_timeout(&SocketAddr::new(address, port), self.config.connect_timeout)
            .map_err(|source| match source.kind() {
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FetchError::Timeout(host.clone()),
                _ => FetchError::Connect {
                    host: host.clone(),
                    source,
                },
            })?;
        let setup = |source: io::Error| FetchError::Io {
            host: host.clone(),
            source,
        };
        tcp.set_read_timeout(Some(self.config.read_timeout)).map_err(setup)?;
        tcp.set_write_timeout(Some(self.config.read_timeout)).map_err(setup)?;

        let request = build_request(url, &self.config.request_headers);
        let (bytes, certificate) = if secure {
            let (mut stream, certificate) =
                tls::handshake(tcp, &host, Arc::clone(&self.roots), self.observer.clone(), deadline)?;
            (self.exchange(&mut stream, &host, &request, deadline)?, certificate)
        } else {
            let mut stream = tcp;
            (self.exchange(&mut stream, &host, &request, deadline)?, None)
        };

        tracing::debug!(%host, bytes = bytes.len(), "verification hash response received");
        FetchedArtifact::from_response_bytes(&host, address, certificate, &bytes)
    }
}
