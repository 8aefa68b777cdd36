//! # Replay-Guarded Store
//!
//! ## Concurrency
//!
//! One `parking_lot::Mutex` guards the live map, the FIFO eviction queue and
//! the blacklist together. Store, evict, blacklist-insert and the consuming
//! load all happen under that single lock, so the queue and the map can
//! never disagree. The store is `Clone` and clones share state.
//!
//! ## Eviction queue
//!
//! Keys are queued in store order, each tagged with the generation of the
//! entry it was queued for. Consumed keys are not removed from the queue
//! eagerly; eviction skips any queued key whose live entry is gone or has a
//! newer generation, and the queue is compacted whenever it grows past twice
//! the live capacity.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::limited_set::LimitedCapacitySet;

/// A hash uploaded to the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredHash {
    /// The 256-bit verification hash.
    pub hash: [u8; 32],
    /// Address of the submitter.
    pub sender_ip: IpAddr,
    /// Submission time, Unix seconds.
    pub sent_at: i64,
}

/// Sizing and expiry for a [`ReplayGuardedStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Maximum number of live entries.
    pub capacity: usize,
    /// Maximum number of blacklisted keys.
    pub blacklist_capacity: usize,
    /// Entries older than this read as missing.
    pub soft_ttl: Option<Duration>,
}

impl StoreConfig {
    /// Default live capacity.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Blacklist size as a multiple of live capacity.
    pub const BLACKLIST_FACTOR: usize = 10;

    /// Soft TTL used by [`StoreConfig::development`].
    pub const DEVELOPMENT_TTL: Duration = Duration::from_secs(100);

    /// A configuration with the given live capacity and a 10× blacklist.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            blacklist_capacity: capacity.saturating_mul(Self::BLACKLIST_FACTOR),
            soft_ttl: None,
        }
    }

    /// The simplified development variant: default sizing plus a 100 second soft TTL.
    pub fn development() -> Self {
        Self {
            soft_ttl: Some(Self::DEVELOPMENT_TTL),
            ..Self::default()
        }
    }

    /// Set the soft TTL.
    pub fn with_soft_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.soft_ttl = ttl;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    stored_at: Instant,
    generation: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    live: HashMap<K, Entry<V>>,
    queue: VecDeque<(K, u64)>,
    used: LimitedCapacitySet<K>,
    next_generation: u64,
}

impl<K: Eq + Hash, V> Inner<K, V> {
    fn is_current(&self, key: &K, generation: u64) -> bool {
        self.live.get(key).is_some_and(|e| e.generation == generation)
    }
}

/// Bounded key→value store with consume-on-read and a replay blacklist.
#[derive(Debug)]
pub struct ReplayGuardedStore<K, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
    config: StoreConfig,
}

impl<K, V> Clone for ReplayGuardedStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config,
        }
    }
}

impl<K, V> ReplayGuardedStore<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                live: HashMap::new(),
                queue: VecDeque::new(),
                used: LimitedCapacitySet::new(config.blacklist_capacity),
                next_generation: 0,
            })),
            config,
        }
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Store `value` under `key`.
    ///
    /// Fails with [`StoreError::AlreadyInUse`] if the key is live or blacklisted.
    pub fn store(&self, key: K, value: V) -> Result<(), StoreError> {
        self.store_at(key, value, Instant::now())
    }

    /// [`store`](Self::store) with an explicit insertion instant.
    pub fn store_at(&self, key: K, value: V, now: Instant) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        if inner.live.contains_key(&key) || inner.used.contains(&key) {
            return Err(StoreError::AlreadyInUse);
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.live.insert(
            key.clone(),
            Entry {
                value,
                stored_at: now,
                generation,
            },
        );
        inner.queue.push_back((key, generation));

        while inner.live.len() > self.config.capacity {
            let Some((oldest, generation)) = inner.queue.pop_front() else {
                break;
            };
            if inner.is_current(&oldest, generation) {
                inner.live.remove(&oldest);
                tracing::debug!(key = ?oldest, "evicted oldest stored entry");
                inner.used.insert(oldest);
            }
        }

        if inner.queue.len() > self.config.capacity.saturating_mul(2) {
            let mut queue = std::mem::take(&mut inner.queue);
            queue.retain(|(k, g)| inner.is_current(k, *g));
            inner.queue = queue;
        }

        Ok(())
    }

    /// Remove and return the value for `key`, blacklisting the key.
    ///
    /// Returns `None` if the key was never stored, was already consumed or
    /// evicted, or has outlived the soft TTL.
    pub fn load(&self, key: &K) -> Option<V> {
        self.load_at(key, Instant::now())
    }

    /// [`load`](Self::load) evaluated at an explicit instant.
    pub fn load_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut inner = self.inner.lock();
        let entry = inner.live.remove(key)?;
        inner.used.insert(key.clone());

        if let Some(ttl) = self.config.soft_ttl {
            if now.saturating_duration_since(entry.stored_at) > ttl {
                tracing::debug!(key = ?key, "stored entry expired before it was read");
                return None;
            }
        }
        Some(entry.value)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Whether there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is blacklisted.
    pub fn is_blacklisted(&self, key: &K) -> bool {
        self.inner.lock().used.contains(key)
    }
}

impl<K, V> Default for ReplayGuardedStore<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn small(capacity: usize) -> ReplayGuardedStore<u32, &'static str> {
        ReplayGuardedStore::new(StoreConfig::with_capacity(capacity))
    }

    #[test]
    fn load_after_store_returns_value_once() {
        let store = small(4);
        store.store(1, "one").unwrap();
        assert_eq!(store.load(&1), Some("one"));
        assert_eq!(store.load(&1), None);
    }

    #[test]
    fn consumed_key_cannot_be_stored_again() {
        let store = small(4);
        store.store(1, "one").unwrap();
        store.load(&1);
        assert_eq!(store.store(1, "again"), Err(StoreError::AlreadyInUse));
        assert!(store.is_blacklisted(&1));
    }

    #[test]
    fn live_key_cannot_be_overwritten() {
        let store = small(4);
        store.store(7, "first").unwrap();
        assert_eq!(store.store(7, "second"), Err(StoreError::AlreadyInUse));
        assert_eq!(store.load(&7), Some("first"));
    }

    #[test]
    fn unknown_key_misses_without_blacklisting() {
        let store = small(4);
        assert_eq!(store.load(&99), None);
        assert!(!store.is_blacklisted(&99));
        store.store(99, "later").unwrap();
    }

    #[test]
    fn overflow_evicts_first_inserted_permanently() {
        let store = small(3);
        for k in 0..4 {
            store.store(k, "v").unwrap();
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.load(&0), None);
        assert_eq!(store.store(0, "v"), Err(StoreError::AlreadyInUse));
        assert_eq!(store.load(&1), Some("v"));
    }

    #[test]
    fn eviction_skips_already_consumed_keys() {
        let store = small(2);
        store.store(1, "a").unwrap();
        store.store(2, "b").unwrap();
        assert_eq!(store.load(&1), Some("a"));
        store.store(3, "c").unwrap();
        // Key 1 was consumed, so 2 and 3 fit without eviction.
        assert_eq!(store.len(), 2);
        store.store(4, "d").unwrap();
        assert_eq!(store.load(&2), None);
        assert_eq!(store.load(&3), Some("c"));
        assert_eq!(store.load(&4), Some("d"));
    }

    #[test]
    fn blacklist_is_bounded() {
        let store: ReplayGuardedStore<u32, ()> = ReplayGuardedStore::new(StoreConfig {
            capacity: 10,
            blacklist_capacity: 2,
            soft_ttl: None,
        });
        for k in 0..3 {
            store.store(k, ()).unwrap();
            store.load(&k);
        }
        // Key 0 fell off the blacklist and may be reused.
        assert!(!store.is_blacklisted(&0));
        assert!(store.store(0, ()).is_ok());
        assert_eq!(store.store(2, ()), Err(StoreError::AlreadyInUse));
    }

    #[test]
    fn reused_key_is_not_evicted_by_its_old_queue_slot() {
        let store: ReplayGuardedStore<u32, &str> = ReplayGuardedStore::new(StoreConfig {
            capacity: 2,
            blacklist_capacity: 1,
            soft_ttl: None,
        });
        store.store(1, "old").unwrap();
        store.load(&1);
        store.store(2, "x").unwrap();
        store.load(&2);
        // Key 1 has fallen off the one-slot blacklist.
        store.store(3, "c").unwrap();
        store.store(1, "new").unwrap();
        store.store(4, "d").unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.load(&3), None);
        assert_eq!(store.load(&1), Some("new"));
        assert_eq!(store.load(&4), Some("d"));
    }

    #[test]
    fn queue_stays_bounded_under_churn() {
        let store = small(4);
        for k in 0..1_000 {
            store.store(k, "v").unwrap();
            store.load(&k);
        }
        assert!(store.inner.lock().queue.len() <= 8);
        assert!(store.is_empty());
    }

    #[test]
    fn soft_ttl_expires_on_read() {
        let store: ReplayGuardedStore<u32, StoredHash> =
            ReplayGuardedStore::new(StoreConfig::development());
        let t0 = Instant::now();
        let record = StoredHash {
            hash: [9; 32],
            sender_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            sent_at: 1_700_000_000,
        };
        store.store_at(1, record.clone(), t0).unwrap();
        store.store_at(2, record.clone(), t0).unwrap();

        assert_eq!(store.load_at(&1, t0 + Duration::from_secs(99)), Some(record));
        assert_eq!(store.load_at(&2, t0 + Duration::from_secs(101)), None);
        assert!(store.is_blacklisted(&2));
    }

    #[test]
    fn clones_share_state() {
        let a = small(4);
        let b = a.clone();
        a.store(5, "x").unwrap();
        assert_eq!(b.load(&5), Some("x"));
        assert_eq!(a.load(&5), None);
    }

    #[test]
    fn concurrent_loads_hand_out_each_value_once() {
        let store: ReplayGuardedStore<u32, u32> = ReplayGuardedStore::default();
        for k in 0..100 {
            store.store(k, k).unwrap();
        }
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = store.clone();
                std::thread::spawn(move || (0..100).filter_map(|k| s.load(&k)).count())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
    }
}
