//! # Service Configuration
//!
//! Every setting has a default so the service starts with no environment
//! at all, as a local demo on port 8080 signing with the published demo key.
//!
//! | Variable                        | Default                                               |
//! |---------------------------------|-------------------------------------------------------|
//! | `PORT`                          | `8080`                                                |
//! | `HASHBACK_ROOT_URL`             | `http://localhost:{PORT}`                             |
//! | `HASHBACK_HOME_URL`             | `https://github.com/billpg/HashBack`                   |
//! | `HASHBACK_DOCS_URL`             | `https://github.com/billpg/HashBack/blob/main/README.md` |
//! | `HASHBACK_JWT_SECRET`           | demo key                                              |
//! | `HASHBACK_ROUNDS_MIN` / `_MAX`  | `1` / `9`                                             |
//! | `HASHBACK_CLOCK_SKEW_SECS`      | `100`                                                 |
//! | `HASHBACK_TOKEN_LIFESPAN_SECS`  | `3600`                                                |
//! | `HASHBACK_HASH_TTL_SECS`        | unset                                                 |
//! | `HASHBACK_STORE_CAPACITY`       | `10000`                                               |
//! | `HASHBACK_FETCH_DEADLINE_SECS`  | `15`                                                  |

use std::str::FromStr;
use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

use hashback_crypto::{TokenError, TokenSigner};
use hashback_fetch::FetchConfig;
use hashback_issuer::{IssuerPolicy, PolicyError};
use hashback_store::StoreConfig;

const DEFAULT_HOME_URL: &str = "https://github.com/billpg/HashBack";
const DEFAULT_DOCS_URL: &str = "https://github.com/billpg/HashBack/blob/main/README.md";

/// Runtime configuration for the HTTP service.
///
/// Custom `Debug` implementation redacts the signing secret.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Listen port.
    pub port: u16,
    /// Public root of this Issuer; its origin must match every `IssuerUrl`.
    pub root_url: Url,
    /// Where `GET /` redirects.
    pub home_url: Url,
    /// Where documentation redirects point.
    pub docs_url: Url,
    /// HMAC key for tokens. `None` means the demo key.
    pub jwt_secret: Option<Zeroizing<Vec<u8>>>,
    /// Lowest accepted `Rounds`.
    pub rounds_min: i32,
    /// Highest accepted `Rounds`.
    pub rounds_max: i32,
    /// Clock skew tolerance.
    pub clock_skew_secs: i64,
    /// Token lifetime.
    pub token_lifespan_secs: i64,
    /// Soft TTL for hosted hashes.
    pub hash_ttl: Option<Duration>,
    /// Live capacity of the hash store.
    pub store_capacity: usize,
    /// Overall deadline for one verification fetch.
    pub fetch_deadline: Duration,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("port", &self.port)
            .field("root_url", &self.root_url.as_str())
            .field("home_url", &self.home_url.as_str())
            .field("docs_url", &self.docs_url.as_str())
            .field(
                "jwt_secret",
                &if self.jwt_secret.is_some() { "[REDACTED]" } else { "[DEMO KEY]" },
            )
            .field("rounds", &(self.rounds_min..=self.rounds_max))
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("token_lifespan_secs", &self.token_lifespan_secs)
            .field("hash_ttl", &self.hash_ttl)
            .field("store_capacity", &self.store_capacity)
            .field("fetch_deadline", &self.fetch_deadline)
            .finish()
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = parse_var(&lookup, "PORT")?.unwrap_or(8080);
        let default_root = format!("http://localhost:{port}");

        Ok(Self {
            port,
            root_url: url_var(&lookup, "HASHBACK_ROOT_URL", &default_root)?,
            home_url: url_var(&lookup, "HASHBACK_HOME_URL", DEFAULT_HOME_URL)?,
            docs_url: url_var(&lookup, "HASHBACK_DOCS_URL", DEFAULT_DOCS_URL)?,
            jwt_secret: lookup("HASHBACK_JWT_SECRET")
                .filter(|s| !s.is_empty())
                .map(|s| Zeroizing::new(s.into_bytes())),
            rounds_min: parse_var(&lookup, "HASHBACK_ROUNDS_MIN")?
                .unwrap_or(IssuerPolicy::DEFAULT_MIN_ROUNDS),
            rounds_max: parse_var(&lookup, "HASHBACK_ROUNDS_MAX")?
                .unwrap_or(IssuerPolicy::DEFAULT_MAX_ROUNDS),
            clock_skew_secs: parse_var(&lookup, "HASHBACK_CLOCK_SKEW_SECS")?
                .unwrap_or(IssuerPolicy::DEFAULT_CLOCK_SKEW_SECS),
            token_lifespan_secs: parse_var(&lookup, "HASHBACK_TOKEN_LIFESPAN_SECS")?
                .unwrap_or(IssuerPolicy::DEFAULT_TOKEN_LIFESPAN_SECS),
            hash_ttl: parse_var(&lookup, "HASHBACK_HASH_TTL_SECS")?.map(Duration::from_secs),
            store_capacity: parse_var(&lookup, "HASHBACK_STORE_CAPACITY")?
                .unwrap_or(StoreConfig::DEFAULT_CAPACITY),
            fetch_deadline: Duration::from_secs(
                parse_var(&lookup, "HASHBACK_FETCH_DEADLINE_SECS")?.unwrap_or(15),
            ),
        })
    }

    /// Defaults for an Issuer rooted at `root_url`, ignoring the environment.
    pub fn for_root(root_url: &str) -> Result<Self, ConfigError> {
        let root = root_url.to_owned();
        Self::from_lookup(move |var| (var == "HASHBACK_ROOT_URL").then(|| root.clone()))
    }

    /// The Issuer policy these settings describe.
    pub fn policy(&self) -> Result<IssuerPolicy, ConfigError> {
        Ok(IssuerPolicy::new(self.root_url.as_str())?
            .with_rounds(self.rounds_min, self.rounds_max)?
            .with_clock_skew_secs(self.clock_skew_secs)?
            .with_token_lifespan_secs(self.token_lifespan_secs)?)
    }

    /// A token signer for the configured secret, or the demo key.
    pub fn signer(&self) -> Result<TokenSigner, ConfigError> {
        let signer = match &self.jwt_secret {
            Some(secret) => TokenSigner::new(secret)?,
            None => TokenSigner::demo()?,
        };
        Ok(signer)
    }

    /// Hash store sizing.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::with_capacity(self.store_capacity).with_soft_ttl(self.hash_ttl)
    }

    /// Fetch limits.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            deadline: self.fetch_deadline,
            ..FetchConfig::default()
        }
    }
}

fn url_var(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = lookup(var).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A URL variable did not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),

    /// A numeric variable did not parse.
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),

    /// The settings do not form a valid Issuer policy.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The signing key was rejected.
    #[error(transparent)]
    Token(#[from] TokenError),
}
