//! The ordered cache engine.

pub mod api;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod id;
pub mod metadata;
pub mod ordered;
pub mod registry;
pub mod store;
pub mod tail;

pub use api::OrderedCacheApi;
pub use codec::{BincodeCodec, CodecError, JsonCodec, RawBytesCodec, ValueCodec};
pub use config::{CacheConfig, CacheLifetime};
pub use entry::{Entry, Snapshot};
pub use error::CacheError;
pub use id::{CacheId, IdGenerator, SequentialIdGenerator, TimeOrderedIdGenerator};
pub use metadata::{Bounds, Metadata};
pub use ordered::{Iter, OrderedCache, SequentialCache, TimeOrderedCache};
pub use registry::{CacheRegistry, CacheScope};
pub use store::{Capacity, MemoryStore, Store};
pub use tail::{TailStream, filter_values, on_next};
pub use tokio_util::sync::CancellationToken;
