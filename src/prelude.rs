/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use ordered_cache_rs::prelude::*;
//! ```
//!
//! brings in the cache types, the shared contract, codecs, cancellation and
//! the remote client and server.

// Core cache types
pub use crate::cache::{
    CacheConfig, CacheError, CacheLifetime, Entry, OrderedCache, SequentialCache, Snapshot,
    TimeOrderedCache,
};

// Identifier generation
pub use crate::cache::{CacheId, IdGenerator, SequentialIdGenerator, TimeOrderedIdGenerator};

// Shared contract and subscriptions
pub use crate::cache::{
    CancellationToken, OrderedCacheApi, TailStream, filter_values, on_next,
};

// Value codecs
pub use crate::cache::{BincodeCodec, JsonCodec, RawBytesCodec, ValueCodec};

// Lifetime registry
pub use crate::cache::{CacheRegistry, CacheScope};

// Remote facade
pub use crate::remote::{CacheServer, RemoteOrderedCache, ServerConfig};

// Utility functions
pub use crate::utils::current_time_millis;
