//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! - **engine**: the Issuer's exchange engine, shared read-only.
//! - **hashes**: the hash hosting service's replay-guarded store.
//! - **clock**: stamps hosted hashes with their receipt time.

use std::sync::Arc;

use uuid::Uuid;

use hashback_core::{Clock, SystemClock};
use hashback_fetch::{FetchClient, HashFetcher, PublicAddressPolicy};
use hashback_issuer::ExchangeEngine;
use hashback_store::{ReplayGuardedStore, StoredHash};

use crate::config::{ConfigError, ServiceConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ExchangeEngine>,
    pub hashes: ReplayGuardedStore<Uuid, StoredHash>,
    pub config: Arc<ServiceConfig>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("hosted_hashes", &self.hashes.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build production state: a real fetch client and the system clock.
    ///
    /// A public Issuer refuses to connect to private or loopback addresses.
    /// A `localhost` Issuer must reach itself, so it skips that check.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ConfigError> {
        let mut client = FetchClient::new().with_config(config.fetch_config());
        if !config.policy()?.is_local_root() {
            client = client.with_observer(Arc::new(PublicAddressPolicy));
        }
        Self::with_parts(config, Arc::new(client), Arc::new(SystemClock))
    }

    /// Build state from explicit collaborators.
    pub fn with_parts(
        config: ServiceConfig,
        fetcher: Arc<dyn HashFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let engine = ExchangeEngine::new(config.policy()?, fetcher, Arc::clone(&clock), config.signer()?);
        if engine.uses_demo_key() {
            tracing::warn!("signing tokens with the published demo key; set HASHBACK_JWT_SECRET");
        }
        Ok(Self {
            engine: Arc::new(engine),
            hashes: ReplayGuardedStore::new(config.store_config()),
            config: Arc::new(config),
            clock,
        })
    }
}
