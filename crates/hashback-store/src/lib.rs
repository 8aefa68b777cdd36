//! # hashback-store: Replay-Guarded Hash Storage
//!
//! The reference hash-hosting service lets a Caller upload a verification
//! hash under a fresh UUID and have the Issuer download it once. This crate
//! provides the in-memory store behind it:
//!
//! - **Consume on read.** A successful [`ReplayGuardedStore::load`] removes
//!   the entry.
//! - **Bounded.** Past capacity, the oldest entry is evicted.
//! - **Replay blacklist.** Consumed and evicted keys can never be stored
//!   again, within the blacklist's own bounded memory.
//! - **Optional soft TTL.** Entries older than the TTL read as missing.
//!
//! Nothing is persisted; a restart forgets everything.

pub mod error;
pub mod limited_set;
pub mod replay;

pub use error::StoreError;
pub use limited_set::LimitedCapacitySet;
pub use replay::{ReplayGuardedStore, StoreConfig, StoredHash};
