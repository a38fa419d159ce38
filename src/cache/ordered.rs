/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! The ordered cache orchestrator.
//!
//! [`OrderedCache`] composes an [`IdGenerator`], an optional bounded tier
//! (L1), the authoritative tier (L2) and a [`Metadata`] index.
//!
//! # Write path
//!
//! Writers are serialized by one mutex that also guards the generator. Inside
//! it, `add` issues the identifier, writes L2 then L1, updates the metadata
//! and finally publishes the tail signal. An entry is therefore visible in
//! both tiers before any subscriber is woken for it.
//!
//! # Read path
//!
//! Readers never take the writer lock. They consult L1 first and fall back
//! to L2. L1 only ever holds a suffix of L2 (eviction pops the lowest
//! identifiers), so a successor found in L1 is the true successor as long as
//! L1's head did not move past the cursor during the lookup.

use crate::cache::config::CacheConfig;
use crate::cache::entry::{Entry, Snapshot};
use crate::cache::error::CacheError;
use crate::cache::id::{CacheId, IdGenerator, SequentialIdGenerator, TimeOrderedIdGenerator};
use crate::cache::metadata::Metadata;
use crate::cache::store::{MemoryStore, Store};
use crate::cache::tail::{self, Signal, TailSource, TailStart, TailStream};
use crate::utils::current_time_nanos;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

/// A cache keyed by dense sequential `u64` identifiers.
pub type SequentialCache<V> = OrderedCache<u64, V>;

/// A cache keyed by time-ordered UUIDs.
pub type TimeOrderedCache<V> = OrderedCache<Uuid, V>;

/// State shared with readers and tail subscribers.
struct Tiers<Id, V> {
    l1: Option<Arc<dyn Store<Id, V>>>,
    l2: Arc<dyn Store<Id, V>>,
    metadata: Metadata<Id>,
    signal: watch::Sender<Signal<Id>>,
}

impl<Id, V> Tiers<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, id: &Id) -> Option<Entry<Id, V>> {
        if let Some(l1) = &self.l1 {
            if let Some(entry) = l1.get(id) {
                return Some(entry);
            }
        }
        self.l2.get(id)
    }

    fn next_after(&self, cursor: &Id) -> Option<Entry<Id, V>> {
        if let Some(l1) = &self.l1 {
            let covers = |l1: &Arc<dyn Store<Id, V>>| l1.first_id().is_some_and(|head| head <= *cursor);
            if covers(l1) {
                let found = l1.next_after(cursor);
                if found.is_some() && covers(l1) {
                    return found;
                }
            }
        }
        self.l2.next_after(cursor)
    }
}

impl<Id, V> TailSource<Id, V> for Tiers<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    fn successor(&self, cursor: Option<Id>) -> Option<Entry<Id, V>> {
        match cursor {
            None => self.l2.first(),
            Some(id) => self.next_after(&id),
        }
    }

    fn subscribe(&self) -> watch::Receiver<Signal<Id>> {
        self.signal.subscribe()
    }
}

/// Mutable writer state, guarded by the writer lock.
struct Writer<Id> {
    generator: Box<dyn IdGenerator<Id>>,
    last_issued: Option<Id>,
    epoch: u64,
}

/// An ordered, append-indexed cache.
///
/// Every added value receives an identifier strictly greater than all
/// previously issued ones. Entries can be read by identifier or position,
/// enumerated, and tailed live. All methods take `&self`; share the cache
/// behind an [`Arc`] to use it from several tasks.
///
/// "Not found" is never an error: lookups return `None` and
/// [`update`](Self::update) returns `Ok(false)`.
///
/// ```rust
/// use ordered_cache_rs::{CacheConfig, SequentialCache};
///
/// let cache = SequentialCache::<String>::sequential(CacheConfig::default()).unwrap();
/// let first = cache.add("a".to_string()).unwrap();
/// let second = cache.add("b".to_string()).unwrap();
/// assert_eq!((*first.id(), *second.id()), (1, 2));
/// assert_eq!(cache.next_after(Some(1)).map(|e| e.into_value()), Some("b".to_string()));
/// ```
pub struct OrderedCache<Id, V> {
    tiers: Arc<Tiers<Id, V>>,
    writer: Mutex<Writer<Id>>,
    config: CacheConfig,
}

impl<Id, V> OrderedCache<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    /// Builds a cache with in-memory tiers as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] if `config` does not
    /// validate.
    pub fn new(config: CacheConfig, generator: impl IdGenerator<Id>) -> Result<Self, CacheError> {
        config.validate()?;
        let l1: Option<Arc<dyn Store<Id, V>>> = if config.include_l1_caching {
            Some(Arc::new(MemoryStore::bounded(config.l1_capacity()?)))
        } else {
            None
        };
        Self::with_stores(config, generator, l1, Arc::new(MemoryStore::unbounded()))
    }

    /// Builds a cache over caller-supplied tiers.
    ///
    /// The metadata index and the last issued identifier are recovered from
    /// `l2`, so the generator continues above whatever it already holds. Any
    /// content of `l1` is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] if `config` does not
    /// validate.
    pub fn with_stores(
        config: CacheConfig,
        generator: impl IdGenerator<Id>,
        l1: Option<Arc<dyn Store<Id, V>>>,
        l2: Arc<dyn Store<Id, V>>,
    ) -> Result<Self, CacheError> {
        config.validate()?;
        if let Some(l1) = &l1 {
            l1.clear();
        }
        let metadata = Metadata::from_store(l2.as_ref());
        let last_issued = metadata.last_id();
        let (signal, _) = watch::channel(Signal::new(last_issued));
        debug!(
            l1 = l1.is_some(),
            entries = l2.len(),
            "ordered cache created"
        );
        Ok(Self {
            tiers: Arc::new(Tiers {
                l1,
                l2,
                metadata,
                signal,
            }),
            writer: Mutex::new(Writer {
                generator: Box::new(generator),
                last_issued,
                epoch: 0,
            }),
            config,
        })
    }

    /// Continues issuing identifiers strictly above `id`, for a cache rebuilt
    /// after its previous instance issued identifiers up to `id`.
    #[must_use]
    pub fn with_last_issued(mut self, id: Id) -> Self {
        let writer = match self.writer.get_mut() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if writer.last_issued.is_none_or(|last| last < id) {
            writer.last_issued = Some(id);
        }
        self
    }

    /// Appends `value`, returning the stored entry.
    ///
    /// # Errors
    ///
    /// - [`CacheError::IdGenerationFailed`] when the generator cannot issue
    ///   an identifier; nothing is stored and no identifier is consumed.
    /// - [`CacheError::NonMonotonicId`] when the generator returns an
    ///   identifier not above the previous one.
    /// - [`CacheError::LockPoisoned`] when a previous writer panicked.
    pub fn add(&self, value: V) -> Result<Entry<Id, V>, CacheError> {
        let mut writer = self.writer.lock().map_err(|_| CacheError::LockPoisoned)?;
        let previous = writer.last_issued;
        let id = writer
            .generator
            .next_id(previous)
            .ok_or(CacheError::IdGenerationFailed)?;
        if let Some(previous) = previous {
            if id <= previous {
                return Err(CacheError::NonMonotonicId {
                    previous: previous.to_string(),
                    generated: id.to_string(),
                });
            }
        }

        let entry = Entry::new(id, value, current_time_nanos());
        self.tiers.l2.insert(entry.clone());
        if let Some(l1) = &self.tiers.l1 {
            l1.insert(entry.clone());
        }
        self.tiers.metadata.record_add(id);
        writer.last_issued = Some(id);

        let epoch = writer.epoch;
        self.tiers.signal.send_replace(Signal {
            epoch,
            last: Some(id),
        });
        trace!(id = %id, "entry added");
        Ok(entry)
    }

    /// Replaces the value of an existing entry, keeping its identifier and
    /// creation time. Returns `Ok(false)` when `id` is not present.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::LockPoisoned`] when a previous writer panicked.
    pub fn update(&self, id: Id, value: V) -> Result<bool, CacheError> {
        let _writer = self.writer.lock().map_err(|_| CacheError::LockPoisoned)?;
        let Some(existing) = self.tiers.l2.get(&id) else {
            return Ok(false);
        };
        let updated = existing.with_value(value);
        self.tiers.l2.replace(updated.clone());
        if let Some(l1) = &self.tiers.l1 {
            // Only refresh L1 when it still holds the entry; inserting would
            // break its suffix ordering.
            l1.replace(updated);
        }
        trace!(id = %id, "entry updated");
        Ok(true)
    }

    /// Deletes the entry with identifier `id` from both tiers, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::LockPoisoned`] when a previous writer panicked.
    pub fn remove(&self, id: Id) -> Result<Option<Entry<Id, V>>, CacheError> {
        let _writer = self.writer.lock().map_err(|_| CacheError::LockPoisoned)?;
        if let Some(l1) = &self.tiers.l1 {
            l1.remove(&id);
        }
        let removed = self.tiers.l2.remove(&id);
        if removed.is_some() {
            self.tiers
                .metadata
                .record_remove(id, self.tiers.l2.as_ref());
            trace!(id = %id, "entry removed");
        }
        Ok(removed)
    }

    /// Empties both tiers and the metadata index. The next `add` receives the
    /// generator's natural first identifier.
    ///
    /// Open tails restart from the first entry added after the clear.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::LockPoisoned`] when a previous writer panicked.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut writer = self.writer.lock().map_err(|_| CacheError::LockPoisoned)?;
        if let Some(l1) = &self.tiers.l1 {
            l1.clear();
        }
        self.tiers.l2.clear();
        self.tiers.metadata.reset();
        writer.last_issued = None;
        writer.epoch += 1;
        let epoch = writer.epoch;
        self.tiers.signal.send_replace(Signal { epoch, last: None });
        debug!(epoch, "ordered cache cleared");
        Ok(())
    }

    /// Number of live entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tiers.l2.len()
    }

    /// The entry with identifier `id`. `None` selects nothing.
    #[must_use]
    pub fn get(&self, id: Option<Id>) -> Option<Entry<Id, V>> {
        id.and_then(|id| self.tiers.get(&id))
    }

    /// The entry with the lowest identifier.
    #[must_use]
    pub fn first(&self) -> Option<Entry<Id, V>> {
        self.tiers.l2.first()
    }

    /// The entry with the highest identifier.
    #[must_use]
    pub fn last(&self) -> Option<Entry<Id, V>> {
        if let Some(l1) = &self.tiers.l1 {
            if let Some(entry) = l1.last() {
                return Some(entry);
            }
        }
        self.tiers.l2.last()
    }

    /// The lowest live identifier.
    #[must_use]
    pub fn first_id(&self) -> Option<Id> {
        self.tiers.metadata.first_id()
    }

    /// The highest live identifier.
    #[must_use]
    pub fn last_id(&self) -> Option<Id> {
        self.tiers.metadata.last_id()
    }

    /// The entry with the smallest identifier strictly greater than `cursor`;
    /// the first entry when `cursor` is `None`.
    #[must_use]
    pub fn next_after(&self, cursor: Option<Id>) -> Option<Entry<Id, V>> {
        self.tiers.successor(cursor)
    }

    /// Like [`next_after`](Self::next_after), but waits for a matching entry
    /// to be added. Returns `None` once `token` is cancelled.
    pub async fn next_async(
        &self,
        cursor: Option<Id>,
        token: CancellationToken,
    ) -> Option<Entry<Id, V>> {
        let start = match cursor {
            Some(id) => TailStart::After(id),
            None => TailStart::Beginning,
        };
        tail::follow(self.tiers.clone(), start, token).next().await
    }

    /// Waits for the first entry added after this call. Returns `None` once
    /// `token` is cancelled.
    pub async fn future_first(&self, token: CancellationToken) -> Option<Entry<Id, V>> {
        tail::follow(self.tiers.clone(), TailStart::Live, token)
            .next()
            .await
    }

    /// Lazily enumerates the entries present when the iterator is created, in
    /// identifier order.
    ///
    /// The iterator does not hold any lock. Entries removed before the
    /// iterator reaches them are skipped; entries added afterwards are not
    /// yielded.
    #[must_use]
    pub fn iter(&self) -> Iter<Id, V> {
        Iter {
            tiers: self.tiers.clone(),
            position: None,
            end: self.tiers.metadata.last_id(),
            done: false,
        }
    }

    /// Collects [`iter`](Self::iter) into a [`Snapshot`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<Id, V> {
        Snapshot {
            entries: self.iter().collect(),
            truncated: false,
        }
    }

    /// Opens a live tail.
    ///
    /// With a `cursor` the stream yields every entry after it, including
    /// entries already present. Without one it yields only entries committed
    /// after this call. The stream ends when `token` is cancelled.
    #[must_use]
    pub fn tail(&self, cursor: Option<Id>, token: CancellationToken) -> TailStream<Id, V> {
        let start = match cursor {
            Some(id) => TailStart::After(id),
            None => TailStart::Live,
        };
        tail::follow(self.tiers.clone(), start, token)
    }

    /// The configuration the cache was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether a bounded tier sits in front of the authoritative tier.
    #[must_use]
    pub fn has_l1(&self) -> bool {
        self.tiers.l1.is_some()
    }
}

impl<V> OrderedCache<u64, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// A cache issuing `1, 2, 3, ...`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] if `config` does not
    /// validate.
    pub fn sequential(config: CacheConfig) -> Result<Self, CacheError> {
        Self::new(config, SequentialIdGenerator::new())
    }
}

impl<V> OrderedCache<Uuid, V>
where
    V: Clone + Send + Sync + 'static,
{
    /// A cache issuing time-ordered UUIDs.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] if `config` does not
    /// validate.
    pub fn time_ordered(config: CacheConfig) -> Result<Self, CacheError> {
        Self::new(config, TimeOrderedIdGenerator::new())
    }
}

impl<Id, V> std::fmt::Debug for OrderedCache<Id, V>
where
    Id: CacheId,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedCache")
            .field("entries", &self.tiers.l2.len())
            .field("bounds", &self.tiers.metadata.bounds())
            .field("l1", &self.tiers.l1.is_some())
            .finish()
    }
}

/// Lazy enumeration returned by [`OrderedCache::iter`].
pub struct Iter<Id, V> {
    tiers: Arc<Tiers<Id, V>>,
    position: Option<Id>,
    end: Option<Id>,
    done: bool,
}

impl<Id, V> Iterator for Iter<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    type Item = Entry<Id, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(end) = self.end else {
            self.done = true;
            return None;
        };
        match self.tiers.successor(self.position) {
            Some(entry) if *entry.id() <= end => {
                self.position = Some(*entry.id());
                Some(entry)
            }
            _ => {
                self.done = true;
                None
            }
        }
    }
}

impl<Id, V> std::iter::FusedIterator for Iter<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
}
