//! The contract shared by local and remote caches.
//!
//! Code written against [`OrderedCacheApi`] runs unchanged against an
//! in-process [`OrderedCache`] or a
//! [`RemoteOrderedCache`](crate::RemoteOrderedCache) talking to a server.

use crate::cache::entry::{Entry, Snapshot};
use crate::cache::error::CacheError;
use crate::cache::id::CacheId;
use crate::cache::ordered::OrderedCache;
use crate::cache::tail::TailStream;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Read, write and tail operations of an ordered cache.
///
/// Fallible operations return `Err` only when the operation itself failed;
/// a missing entry is `Ok(None)` (or `Ok(false)` for `update`). Suspending
/// operations never fail: they return `None` or end the stream when
/// cancelled or when the underlying source breaks.
#[async_trait]
pub trait OrderedCacheApi<Id, V>: Send + Sync
where
    Id: CacheId,
    V: Send + 'static,
{
    /// Appends `value` under a freshly issued identifier.
    async fn add(&self, value: V) -> Result<Entry<Id, V>, CacheError>;

    /// Replaces the value of an existing entry; `Ok(false)` if absent.
    async fn update(&self, id: Id, value: V) -> Result<bool, CacheError>;

    /// Deletes an entry, returning it if it existed.
    async fn remove(&self, id: Id) -> Result<Option<Entry<Id, V>>, CacheError>;

    /// Removes every entry.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Number of live entries.
    async fn count(&self) -> Result<usize, CacheError>;

    /// The entry with identifier `id`; `None` selects nothing.
    async fn get(&self, id: Option<Id>) -> Result<Option<Entry<Id, V>>, CacheError>;

    /// The entry with the lowest identifier.
    async fn first(&self) -> Result<Option<Entry<Id, V>>, CacheError>;

    /// The entry with the highest identifier.
    async fn last(&self) -> Result<Option<Entry<Id, V>>, CacheError>;

    /// The lowest live identifier.
    async fn first_id(&self) -> Result<Option<Id>, CacheError>;

    /// The highest live identifier.
    async fn last_id(&self) -> Result<Option<Id>, CacheError>;

    /// The entry after `cursor`, or the first entry for `None`.
    async fn next_after(&self, cursor: Option<Id>) -> Result<Option<Entry<Id, V>>, CacheError>;

    /// Waits for the entry after `cursor` (the first entry for `None`).
    async fn next_async(&self, cursor: Option<Id>, token: CancellationToken) -> Option<Entry<Id, V>>;

    /// Waits for the first entry added after the call.
    async fn future_first(&self, token: CancellationToken) -> Option<Entry<Id, V>>;

    /// All current entries in identifier order.
    async fn snapshot(&self) -> Result<Snapshot<Id, V>, CacheError>;

    /// Opens a live tail after `cursor`, or after the current end for `None`.
    ///
    /// Resolves once the subscription is registered with the cache, so with
    /// `None` every entry committed after the call returns is delivered.
    async fn tail(&self, cursor: Option<Id>, token: CancellationToken) -> TailStream<Id, V>;
}

#[async_trait]
impl<Id, V> OrderedCacheApi<Id, V> for OrderedCache<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    async fn add(&self, value: V) -> Result<Entry<Id, V>, CacheError> {
        OrderedCache::add(self, value)
    }

    async fn update(&self, id: Id, value: V) -> Result<bool, CacheError> {
        OrderedCache::update(self, id, value)
    }

    async fn remove(&self, id: Id) -> Result<Option<Entry<Id, V>>, CacheError> {
        OrderedCache::remove(self, id)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        OrderedCache::clear(self)
    }

    async fn count(&self) -> Result<usize, CacheError> {
        Ok(OrderedCache::count(self))
    }

    async fn get(&self, id: Option<Id>) -> Result<Option<Entry<Id, V>>, CacheError> {
        Ok(OrderedCache::get(self, id))
    }

    async fn first(&self) -> Result<Option<Entry<Id, V>>, CacheError> {
        Ok(OrderedCache::first(self))
    }

    async fn last(&self) -> Result<Option<Entry<Id, V>>, CacheError> {
        Ok(OrderedCache::last(self))
    }

    async fn first_id(&self) -> Result<Option<Id>, CacheError> {
        Ok(OrderedCache::first_id(self))
    }

    async fn last_id(&self) -> Result<Option<Id>, CacheError> {
        Ok(OrderedCache::last_id(self))
    }

    async fn next_after(&self, cursor: Option<Id>) -> Result<Option<Entry<Id, V>>, CacheError> {
        Ok(OrderedCache::next_after(self, cursor))
    }

    async fn next_async(&self, cursor: Option<Id>, token: CancellationToken) -> Option<Entry<Id, V>> {
        OrderedCache::next_async(self, cursor, token).await
    }

    async fn future_first(&self, token: CancellationToken) -> Option<Entry<Id, V>> {
        OrderedCache::future_first(self, token).await
    }

    async fn snapshot(&self) -> Result<Snapshot<Id, V>, CacheError> {
        Ok(OrderedCache::snapshot(self))
    }

    async fn tail(&self, cursor: Option<Id>, token: CancellationToken) -> TailStream<Id, V> {
        OrderedCache::tail(self, cursor, token)
    }
}
