#![deny(missing_docs)]

//! # hashback-core: Protocol Types for HashBack
//!
//! HashBack lets a Caller prove control over a URL without any pre-shared
//! secret. The Caller publishes the hash of its own request at a URL it
//! controls; the Issuer recomputes that hash, downloads the published copy
//! and, when the two agree, hands back a short-lived token.
//!
//! This crate holds the pieces both sides must agree on byte for byte:
//!
//! - [`ProtocolVersion`] pins the version tag and its fixed PBKDF2 salt.
//! - [`VerificationRequest`] is the parsed, immutable Caller request.
//! - [`CanonicalBytes`] is the only path from a request to hashable bytes.
//! - [`encoding`] wraps the two base64 alphabets the protocol uses.
//! - [`Clock`] abstracts "now" so the exchange can be tested deterministically.
//!
//! No I/O happens here; fetching lives in `hashback-fetch` and hashing in
//! `hashback-crypto`.

pub mod canonical;
pub mod encoding;
pub mod error;
pub mod request;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use error::{CanonicalizationError, RequestError};
pub use request::{ProtocolVersion, ResponseType, VerificationRequest};
pub use temporal::{Clock, ManualClock, SystemClock};
