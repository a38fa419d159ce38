//! # Ordered Append-Indexed Cache
//!
//! An in-memory cache of values keyed by strictly increasing identifiers,
//! with a bounded fast tier (L1) in front of an authoritative tier (L2), an
//! O(1) metadata index of the first and last stored identifiers, live tail
//! subscriptions, and a streaming remote facade that exposes the same
//! contract over a network connection.
//!
//! ## Key Features
//!
//! - **Monotonic Identifiers**: every `add` draws a fresh identifier from a
//!   pluggable [`IdGenerator`]. Sequential `u64` counters and time-ordered
//!   UUIDv7 identifiers ship with the crate. A generator that fails or stops
//!   advancing turns the add into an error and leaves the cache untouched.
//!
//! - **Two-Tier Storage**: L2 holds every entry. L1, when enabled, keeps a
//!   recent window bounded by a `[min, max]` capacity and evicts from the
//!   oldest end. Reads consult L1 first and fall back to L2, so evictions
//!   never change what a reader observes.
//!
//! - **Lock-Free Reads**: both tiers are `crossbeam-skiplist` maps and the
//!   metadata index is an `AtomicCell`, so readers never wait on writers.
//!   Writes are serialized by a single writer lock.
//!
//! - **Live Tails**: [`OrderedCache::tail`] yields every entry after a cursor
//!   in order, then keeps yielding new entries as they are committed, until
//!   its [`CancellationToken`] fires. Subscribers pull from the cache with
//!   their own cursor, so a slow consumer never holds back writers or other
//!   consumers.
//!
//! - **Remote Facade**: [`CacheServer`] is a `tonic` gRPC service answering
//!   from a local byte-valued cache, with server-streaming calls for
//!   snapshots and live tails; [`RemoteOrderedCache`] implements
//!   [`OrderedCacheApi`] on top of a channel and a [`ValueCodec`], so local
//!   and remote caches are interchangeable.
//!
//! - **Lifetime Registry**: [`CacheRegistry`] resolves keyed caches as
//!   singletons, per-scope instances or fresh transients.
//!
//! ## Example
//!
//! ```rust
//! use ordered_cache_rs::{CacheConfig, SequentialCache};
//!
//! let cache = SequentialCache::<String>::sequential(CacheConfig::default())?;
//! let first = cache.add("alpha".to_string())?;
//! let second = cache.add("beta".to_string())?;
//!
//! assert_eq!(*first.id(), 1);
//! assert_eq!(*second.id(), 2);
//! assert_eq!(cache.next_after(Some(1)).map(|e| *e.id()), Some(2));
//! assert_eq!(cache.last_id(), Some(2));
//! # Ok::<(), ordered_cache_rs::CacheError>(())
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use ordered_cache_rs::{CacheConfig, CacheLifetime};
//!
//! let config = CacheConfig::from_json(
//!     r#"{ "include_l1_caching": true, "l1_min_cap": 16, "l1_max_cap": 64,
//!          "lifetime": "Transient", "registration_key": "events" }"#,
//! )?;
//! assert_eq!(config.lifetime, CacheLifetime::Transient);
//! # Ok::<(), ordered_cache_rs::CacheError>(())
//! ```
//!
//! ## Consistency
//!
//! Single operations are linearizable with respect to the writer lock.
//! Enumeration ([`OrderedCache::iter`], [`OrderedCache::snapshot`]) is
//! weakly consistent: it yields entries in ascending order, never yields an
//! entry twice, and stops at the last identifier known when it started.
//!
//! ## Logging
//!
//! The crate emits `tracing` events and installs no subscriber; binaries and
//! tests choose their own.

pub mod cache;
pub mod remote;

pub mod prelude;
mod utils;

pub use cache::{
    BincodeCodec, CacheConfig, CacheError, CacheId, CacheLifetime, CacheRegistry, CacheScope,
    CancellationToken, Capacity, CodecError, Entry, IdGenerator, JsonCodec, MemoryStore,
    OrderedCache, OrderedCacheApi, RawBytesCodec, SequentialCache, SequentialIdGenerator,
    Snapshot, Store, TailStream, TimeOrderedCache, TimeOrderedIdGenerator, ValueCodec,
    filter_values, on_next,
};
pub use remote::{CacheServer, RemoteOrderedCache, ServerConfig};
pub use utils::{current_time_millis, current_time_nanos};
