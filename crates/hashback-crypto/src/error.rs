//! Error types for hashing and token signing.

use thiserror::Error;

/// Errors computing a verification hash.
#[derive(Error, Debug)]
pub enum HashError {
    /// The request could not be canonicalized.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] hashback_core::CanonicalizationError),

    /// PBKDF2 needs at least one iteration.
    #[error("rounds must be at least 1, got {0}")]
    InvalidRounds(i32),
}

/// Errors constructing a token signer.
#[derive(Error, Debug)]
pub enum TokenError {
    /// An empty HMAC key was supplied.
    #[error("token signing key must not be empty")]
    EmptyKey,

    /// The HMAC implementation refused the key.
    #[error("token signing key rejected: {0}")]
    InvalidKey(String),
}
