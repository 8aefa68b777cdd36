//! A set that forgets its oldest members once it reaches capacity.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// FIFO-bounded set.
///
/// Not synchronized; callers wrap it in their own lock.
#[derive(Debug, Clone)]
pub struct LimitedCapacitySet<K> {
    members: HashSet<K>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone> LimitedCapacitySet<K> {
    /// Create an empty set holding at most `capacity` members (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Add a member. Returns `false` if it was already present.
    ///
    /// When the set is full the oldest member is dropped.
    pub fn insert(&mut self, key: K) -> bool {
        if !self.members.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    /// Membership test.
    pub fn contains(&self, key: &K) -> bool {
        self.members.contains(key)
    }

    /// Current number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Maximum number of members.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
