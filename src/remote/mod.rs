//! Remote facade: the cache contract over gRPC.
//!
//! - [`proto`]: messages and service stubs generated from
//!   `proto/ordered_cache.proto`.
//! - [`server`]: [`CacheServer`], answering calls from a local cache.
//! - [`client`]: [`RemoteOrderedCache`], implementing
//!   [`OrderedCacheApi`](crate::OrderedCacheApi) through a channel.
//!
//! Failures travel as gRPC statuses and are mapped to and from
//! [`CacheError`](crate::CacheError).

pub mod client;
pub mod server;
mod status;

/// Generated protocol types.
#[allow(missing_docs)]
pub mod proto {
    tonic::include_proto!("ordered_cache");
}

pub use client::{DEFAULT_CONNECT_TIMEOUT, RemoteOrderedCache, endpoint};
pub use server::{CacheServer, DEFAULT_ENUMERATE_BUDGET, DEFAULT_ENUMERATE_YIELD_EVERY, ServerConfig};
