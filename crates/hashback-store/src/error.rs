//! Store errors.

use thiserror::Error;

/// Errors from [`ReplayGuardedStore`](crate::ReplayGuardedStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key is live, or was consumed or evicted earlier and is blacklisted.
    #[error("key is already in use")]
    AlreadyInUse,
}
