//! # hashback-fetch: Verification Hash Retrieval
//!
//! A deliberately small HTTP client. It exists to fetch one short text file
//! from a Caller-controlled URL without trusting that Caller:
//!
//! 1. Resolve the host ([`resolver`]) and pick one address, preferring IPv6
//!    and rotating across calls.
//! 2. Connect over TCP with bounded connect and read timeouts.
//! 3. For `https`, handshake with rustls while capturing the peer
//!    certificate before any verdict ([`tls`]).
//! 4. Send a fixed-shape `GET` ([`http::build_request`]).
//! 5. Read until EOF, 64 KiB, or the overall deadline.
//! 6. Parse leniently, validate strictly ([`http::parse_verification_response`]).
//!
//! It never follows redirects and never retries. No chunked encoding, no
//! HTTP/2, no connection reuse.

pub mod artifact;
pub mod client;
pub mod error;
pub mod http;
pub mod observer;
pub mod resolver;
pub mod tls;

pub use artifact::FetchedArtifact;
pub use client::{FetchClient, FetchConfig, HashFetcher};
pub use error::{FetchError, ResponseError};
pub use observer::{FetchObserver, PublicAddressPolicy};
pub use resolver::{AddressSelector, HostResolver, RotatingSelector, StaticResolver, SystemResolver};

pub use rustls::pki_types::CertificateDer;
