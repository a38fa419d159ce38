//! Ordered entry containers backing the cache tiers.
//!
//! A [`Store`] maps identifiers to entries and keeps them in identifier
//! order. The crate ships one implementation, [`MemoryStore`], built on a
//! lock-free skip list. It is used both as the bounded fast tier (with a
//! [`Capacity`]) and as the unbounded authoritative tier.

use crate::cache::entry::Entry;
use crate::cache::error::CacheError;
use crossbeam_skiplist::SkipMap;
use std::ops::Bound;
use tracing::trace;

/// Eviction bounds of a bounded tier.
///
/// When an insert leaves more than `max` entries, the lowest identifiers
/// are evicted until exactly `min` remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    min: usize,
    max: usize,
}

impl Capacity {
    /// Creates eviction bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] when `min` is zero or
    /// exceeds `max`.
    pub fn new(min: usize, max: usize) -> Result<Self, CacheError> {
        if min == 0 {
            return Err(CacheError::InvalidConfiguration {
                message: "minimum capacity must be positive".to_string(),
            });
        }
        if min > max {
            return Err(CacheError::InvalidConfiguration {
                message: format!("minimum capacity {min} exceeds maximum capacity {max}"),
            });
        }
        Ok(Self { min, max })
    }

    /// Number of entries kept after an eviction pass.
    #[must_use]
    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    /// Largest number of entries held before eviction starts.
    #[must_use]
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }
}

/// A keyed container of entries ordered by identifier.
///
/// Implementations must tolerate concurrent readers while a single writer
/// mutates them. The cache serializes all writers, so mutating methods are
/// never called concurrently with each other.
pub trait Store<Id, V>: Send + Sync {
    /// Inserts `entry`, returning how many entries were evicted to make room.
    fn insert(&self, entry: Entry<Id, V>) -> usize;

    /// Replaces the entry with the same identifier. Returns `false`, leaving
    /// the store untouched, when no such entry exists.
    fn replace(&self, entry: Entry<Id, V>) -> bool;

    /// Looks up an entry by identifier.
    fn get(&self, id: &Id) -> Option<Entry<Id, V>>;

    /// Whether an entry with this identifier is present.
    fn contains(&self, id: &Id) -> bool;

    /// Removes and returns the entry with this identifier.
    fn remove(&self, id: &Id) -> Option<Entry<Id, V>>;

    /// The entry with the lowest identifier.
    fn first(&self) -> Option<Entry<Id, V>>;

    /// The entry with the highest identifier.
    fn last(&self) -> Option<Entry<Id, V>>;

    /// The lowest identifier present.
    fn first_id(&self) -> Option<Id>;

    /// The highest identifier present.
    fn last_id(&self) -> Option<Id>;

    /// The entry with the smallest identifier strictly greater than `id`.
    fn next_after(&self, id: &Id) -> Option<Entry<Id, V>>;

    /// Number of entries held.
    fn len(&self) -> usize;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    fn clear(&self);
}

/// In-memory [`Store`] backed by a [`SkipMap`].
///
/// Reads are lock-free; the skip list keeps entries sorted so positional
/// queries are `O(log n)` and first/last are `O(1)`.
pub struct MemoryStore<Id, V> {
    entries: SkipMap<Id, Entry<Id, V>>,
    capacity: Option<Capacity>,
}

impl<Id, V> MemoryStore<Id, V>
where
    Id: Ord + Send + 'static,
    V: Send + 'static,
{
    /// Creates a store with no capacity limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            entries: SkipMap::new(),
            capacity: None,
        }
    }

    /// Creates a store that evicts its oldest entries according to `capacity`.
    #[must_use]
    pub fn bounded(capacity: Capacity) -> Self {
        Self {
            entries: SkipMap::new(),
            capacity: Some(capacity),
        }
    }

    /// The eviction bounds, if any.
    #[must_use]
    pub fn capacity(&self) -> Option<Capacity> {
        self.capacity
    }

    fn evict(&self) -> usize {
        let Some(capacity) = self.capacity else {
            return 0;
        };
        if self.entries.len() <= capacity.max {
            return 0;
        }
        let mut evicted = 0;
        while self.entries.len() > capacity.min {
            if self.entries.pop_front().is_none() {
                break;
            }
            evicted += 1;
        }
        trace!(evicted, remaining = self.entries.len(), "bounded tier evicted");
        evicted
    }
}

impl<Id, V> Default for MemoryStore<Id, V>
where
    Id: Ord + Send + 'static,
    V: Send + 'static,
{
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<Id, V> std::fmt::Debug for MemoryStore<Id, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<Id, V> Store<Id, V> for MemoryStore<Id, V>
where
    Id: Ord + Copy + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn insert(&self, entry: Entry<Id, V>) -> usize {
        self.entries.insert(*entry.id(), entry);
        self.evict()
    }

    fn replace(&self, entry: Entry<Id, V>) -> bool {
        if !self.entries.contains_key(entry.id()) {
            return false;
        }
        self.entries.insert(*entry.id(), entry);
        true
    }

    fn get(&self, id: &Id) -> Option<Entry<Id, V>> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    fn contains(&self, id: &Id) -> bool {
        self.entries.contains_key(id)
    }

    fn remove(&self, id: &Id) -> Option<Entry<Id, V>> {
        self.entries.remove(id).map(|e| e.value().clone())
    }

    fn first(&self) -> Option<Entry<Id, V>> {
        self.entries.front().map(|e| e.value().clone())
    }

    fn last(&self) -> Option<Entry<Id, V>> {
        self.entries.back().map(|e| e.value().clone())
    }

    fn first_id(&self) -> Option<Id> {
        self.entries.front().map(|e| *e.key())
    }

    fn last_id(&self) -> Option<Id> {
        self.entries.back().map(|e| *e.key())
    }

    fn next_after(&self, id: &Id) -> Option<Entry<Id, V>> {
        self.entries
            .lower_bound(Bound::Excluded(id))
            .map(|e| e.value().clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
