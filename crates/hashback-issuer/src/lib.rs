//! # hashback-issuer: The Verification Exchange
//!
//! Decides whether a Caller has proven control of the domain it names.
//!
//! ```text
//! JSON body ──► VerificationRequest ──► policy checks ──► fetch ──► compare ──► token
//!                      │                     │              │          │
//!                      └─────────────────────┴──────────────┴──────────┴──► Rejection
//! ```
//!
//! - [`policy::IssuerPolicy`]: this Issuer's root origin and numeric limits.
//! - [`url_policy`]: which `VerifyUrl`s this Issuer will fetch.
//! - [`engine::ExchangeEngine`]: runs the checks in a fixed order; the first
//!   failure wins.
//! - [`outcome`]: the tagged success and rejection values.
//!
//! The engine is synchronous. HTTP front ends run it on a blocking thread.

pub mod engine;
pub mod outcome;
pub mod policy;
pub mod url_policy;

pub use engine::ExchangeEngine;
pub use outcome::{Advisory, BearerTokenBody, ExchangeResponse, ExchangeStage, IssuedToken, Rejection};
pub use policy::{IssuerPolicy, PolicyError};
pub use url_policy::{check_verify_url, VerifyUrlViolation};
