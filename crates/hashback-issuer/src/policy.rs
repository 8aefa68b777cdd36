//! # Issuer Policy
//!
//! Static facts about one Issuer deployment. Built once at startup and
//! shared read-only by every exchange.

use std::ops::RangeInclusive;

use thiserror::Error;
use url::Url;

/// Invalid Issuer configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The root URL did not parse.
    #[error("root URL {url:?} is not a valid URL: {reason}")]
    InvalidRootUrl {
        /// The rejected value.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The root URL has no scheme/host/port origin.
    #[error("root URL {0:?} has no host")]
    RootWithoutHost(String),

    /// Rounds bounds must satisfy `1 <= min <= max`.
    #[error("rounds range {min}-{max} is invalid")]
    InvalidRounds {
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },

    /// A duration setting must be positive.
    #[error("{name} must be positive, got {value}")]
    NotPositive {
        /// Setting name.
        name: &'static str,
        /// The rejected value.
        value: i64,
    },
}

/// Limits and identity for one Issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerPolicy {
    root_origin: String,
    root_host: String,
    clock_skew_secs: i64,
    rounds: RangeInclusive<i32>,
    token_lifespan_secs: i64,
    hash_store_path: String,
}

impl IssuerPolicy {
    /// Maximum distance, exclusive, between Caller and Issuer clocks.
    pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 100;
    /// Default lowest accepted `Rounds`.
    pub const DEFAULT_MIN_ROUNDS: i32 = 1;
    /// Default highest accepted `Rounds`.
    pub const DEFAULT_MAX_ROUNDS: i32 = 9;
    /// Lifetime of issued tokens.
    pub const DEFAULT_TOKEN_LIFESPAN_SECS: i64 = 3600;
    /// Path of the Issuer's own hash-hosting endpoint.
    pub const DEFAULT_HASH_STORE_PATH: &'static str = "/hashes";

    /// A policy with default limits for the Issuer rooted at `root_url`.
    pub fn new(root_url: &str) -> Result<Self, PolicyError> {
        let url = Url::parse(root_url).map_err(|e| PolicyError::InvalidRootUrl {
            url: root_url.to_owned(),
            reason: e.to_string(),
        })?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(PolicyError::RootWithoutHost(root_url.to_owned()));
        }
        let root_host = url
            .host_str()
            .ok_or_else(|| PolicyError::RootWithoutHost(root_url.to_owned()))?
            .to_owned();

        Ok(Self {
            root_origin: origin.ascii_serialization(),
            root_host,
            clock_skew_secs: Self::DEFAULT_CLOCK_SKEW_SECS,
            rounds: Self::DEFAULT_MIN_ROUNDS..=Self::DEFAULT_MAX_ROUNDS,
            token_lifespan_secs: Self::DEFAULT_TOKEN_LIFESPAN_SECS,
            hash_store_path: Self::DEFAULT_HASH_STORE_PATH.to_owned(),
        })
    }

    /// Accept `Rounds` in `min..=max`.
    pub fn with_rounds(mut self, min: i32, max: i32) -> Result<Self, PolicyError> {
        if min < 1 || min > max {
            return Err(PolicyError::InvalidRounds { min, max });
        }
        self.rounds = min..=max;
        Ok(self)
    }

    /// Set the clock skew tolerance.
    pub fn with_clock_skew_secs(mut self, secs: i64) -> Result<Self, PolicyError> {
        if secs <= 0 {
            return Err(PolicyError::NotPositive {
                name: "clock skew",
                value: secs,
            });
        }
        self.clock_skew_secs = secs;
        Ok(self)
    }

    /// Set the token lifetime.
    pub fn with_token_lifespan_secs(mut self, secs: i64) -> Result<Self, PolicyError> {
        if secs <= 0 {
            return Err(PolicyError::NotPositive {
                name: "token lifespan",
                value: secs,
            });
        }
        self.token_lifespan_secs = secs;
        Ok(self)
    }

    /// Set the path of the Issuer's own hash store.
    pub fn with_hash_store_path(mut self, path: impl Into<String>) -> Self {
        self.hash_store_path = path.into();
        self
    }

    /// `scheme://host[:port]` with default ports elided.
    pub fn root_origin(&self) -> &str {
        &self.root_origin
    }

    /// Host of the root URL; used as the token issuer.
    pub fn root_host(&self) -> &str {
        &self.root_host
    }

    /// Whether this Issuer runs on `localhost`.
    pub fn is_local_root(&self) -> bool {
        self.root_host.eq_ignore_ascii_case("localhost")
    }

    /// Clock skew tolerance in seconds.
    pub fn clock_skew_secs(&self) -> i64 {
        self.clock_skew_secs
    }

    /// Accepted `Rounds`.
    pub fn rounds(&self) -> &RangeInclusive<i32> {
        &self.rounds
    }

    /// Token lifetime in seconds.
    pub fn token_lifespan_secs(&self) -> i64 {
        self.token_lifespan_secs
    }

    /// Path of the Issuer's own hash store.
    pub fn hash_store_path(&self) -> &str {
        &self.hash_store_path
    }

    /// Whether `url` has the same origin as this Issuer.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        let origin = url.origin();
        origin.is_tuple() && origin.ascii_serialization() == self.root_origin
    }

    /// Whether `a` and `b` differ by strictly less than the skew tolerance.
    pub fn is_close(&self, a: i64, b: i64) -> bool {
        a.abs_diff(b) < self.clock_skew_secs.unsigned_abs()
    }
}
