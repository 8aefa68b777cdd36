//! # hashback-crypto: Hashing and Signing for HashBack
//!
//! - [`verification`]: the versioned PBKDF2-HMAC-SHA256 hash that binds a
//!   request to the artifact the Caller publishes.
//! - [`jwt`]: HS256 token assembly for the Issuer's response.
//!
//! Both are pure functions of their inputs.

pub mod error;
pub mod jwt;
pub mod verification;

pub use error::{HashError, TokenError};
pub use jwt::{build_signed_token, TokenClaims, TokenSigner, DEMO_SIGNING_KEY};
pub use verification::{compute_verification_hash, VerificationHash};
