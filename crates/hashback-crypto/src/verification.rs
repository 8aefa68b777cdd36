//! # Verification Hash
//!
//! `PBKDF2-HMAC-SHA256(password = canonical request bytes, salt = version
//! salt, iterations = Rounds, length = 32)`, rendered as standard base64.
//!
//! The Caller publishes this value at its `VerifyUrl`; the Issuer computes
//! it independently and compares. The salt is fixed per protocol version and
//! never travels over the wire.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use hashback_core::encoding;
use hashback_core::VerificationRequest;

use crate::error::HashError;

/// A 256-bit verification hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationHash([u8; 32]);

impl VerificationHash {
    /// Wrap raw hash bytes, e.g. as extracted from a fetched artifact.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a published hash from its base64 form.
    pub fn from_base64(text: &str) -> Option<Self> {
        encoding::decode_256_bits(text).map(Self)
    }

    /// Compute the hash for a request.
    pub fn compute(request: &VerificationRequest) -> Result<Self, HashError> {
        let iterations =
            u32::try_from(request.rounds).map_err(|_| HashError::InvalidRounds(request.rounds))?;
        if iterations == 0 {
            return Err(HashError::InvalidRounds(request.rounds));
        }
        let canonical = request.canonical_bytes()?;
        let mut out = [0u8; 32];
        pbkdf2_hmac::<Sha256>(
            canonical.as_bytes(),
            request.version.salt(),
            iterations,
            &mut out,
        );
        Ok(Self(out))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Standard padded base64, 44 characters.
    pub fn to_base64(&self) -> String {
        encoding::to_base64(&self.0)
    }

    /// Compare in constant time.
    pub fn matches(&self, other: &VerificationHash) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl std::fmt::Display for VerificationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl std::fmt::Debug for VerificationHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerificationHash({})", self.to_base64())
    }
}

/// Compute the verification hash of a request.
pub fn compute_verification_hash(request: &VerificationRequest) -> Result<VerificationHash, HashError> {
    VerificationHash::compute(request)
}
