/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Client-side proxy implementing [`OrderedCacheApi`] over gRPC.
//!
//! Remote caches are keyed by sequential `u64` identifiers only; the type
//! parameters make any other identifier impossible to request. Values are
//! converted with the [`ValueCodec`] chosen at construction.
//!
//! Unary operations report transport, codec and server faults as
//! [`CacheError`]. Suspending operations (`next_async`, `future_first` and
//! live tails) log those failures and end with "no result" instead.

use crate::cache::api::OrderedCacheApi;
use crate::cache::codec::ValueCodec;
use crate::cache::entry::{Entry, Snapshot};
use crate::cache::error::CacheError;
use crate::cache::tail::TailStream;
use crate::remote::proto::cache_service_client::CacheServiceClient;
use crate::remote::proto::{
    AddRequest, Empty, EntryResponse, EnumerateFutureRequest, GetRequest, IdRequest, IdResponse,
    UpdateRequest, enumerate_reply,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tonic::{Response, Status};
use tracing::{trace, warn};

/// Default time allowed for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// An endpoint for the server at `addr`, with the default connect timeout.
/// `addr` is either `host:port` or a full `http://` URI.
///
/// # Errors
///
/// Returns [`CacheError::Transport`] when `addr` is not a valid URI.
pub fn endpoint(addr: &str) -> Result<Endpoint, CacheError> {
    let uri = if addr.contains("://") {
        addr.to_string()
    } else {
        format!("http://{addr}")
    };
    Ok(Endpoint::from_shared(uri)?
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .tcp_nodelay(true))
}

/// A remote ordered cache reached through a gRPC channel.
///
/// ```rust,no_run
/// use ordered_cache_rs::prelude::*;
///
/// # async fn demo() -> Result<(), CacheError> {
/// let cache = RemoteOrderedCache::connect("127.0.0.1:49971", JsonCodec::<String>::new())?;
/// let entry = cache.add("hello".to_string()).await?;
/// println!("stored as {}", entry.id());
/// # Ok(())
/// # }
/// ```
pub struct RemoteOrderedCache<V, C> {
    client: CacheServiceClient<Channel>,
    codec: Arc<C>,
    _marker: PhantomData<fn() -> V>,
}

impl<V, C> RemoteOrderedCache<V, C>
where
    C: ValueCodec<V>,
{
    /// A client for the server at `addr`. The connection is established on
    /// first use and re-established after failures. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Transport`] when `addr` is not a valid address.
    pub fn connect(addr: &str, codec: C) -> Result<Self, CacheError> {
        Ok(Self::with_channel(endpoint(addr)?.connect_lazy(), codec))
    }

    /// A client over an existing channel.
    #[must_use]
    pub fn with_channel(channel: Channel, codec: C) -> Self {
        Self {
            client: CacheServiceClient::new(channel),
            codec: Arc::new(codec),
            _marker: PhantomData,
        }
    }

    /// The value codec in use.
    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// A handle on the generated client; clones share the channel.
    fn client(&self) -> CacheServiceClient<Channel> {
        self.client.clone()
    }

    fn decode(&self, response: Response<EntryResponse>) -> Result<Option<Entry<u64, V>>, CacheError> {
        decode_entry(self.codec.as_ref(), response.into_inner())
    }

    /// Runs a waiting call, giving up on cancellation. Dropping the call
    /// resets its stream, which cancels the wait on the server.
    async fn wait_for<F>(&self, operation: &'static str, call: F, token: CancellationToken) -> Option<Entry<u64, V>>
    where
        F: Future<Output = Result<Response<EntryResponse>, Status>> + Send,
    {
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            result = call => result,
        };
        match result.map_err(CacheError::from).and_then(|r| self.decode(r)) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(op = operation, error = %e, "remote wait failed");
                None
            }
        }
    }
}

fn decode_entry<V, C>(codec: &C, response: EntryResponse) -> Result<Option<Entry<u64, V>>, CacheError>
where
    C: ValueCodec<V> + ?Sized,
{
    if !response.has_value {
        return Ok(None);
    }
    let value = codec.decode(&response.value)?;
    Ok(Some(Entry::new(
        response.id,
        value,
        response.created_at_utc_ns,
    )))
}

fn get_request(id: Option<u64>) -> GetRequest {
    GetRequest {
        has_id: id.is_some(),
        id: id.unwrap_or_default(),
    }
}

fn optional_id(response: Response<IdResponse>) -> Option<u64> {
    let response = response.into_inner();
    response.has_value.then_some(response.id)
}

#[async_trait]
impl<V, C> OrderedCacheApi<u64, V> for RemoteOrderedCache<V, C>
where
    V: Send + Sync + 'static,
    C: ValueCodec<V>,
{
    async fn add(&self, value: V) -> Result<Entry<u64, V>, CacheError> {
        let value = self.codec.encode(&value)?;
        let response = self.client().add(AddRequest { value }).await?;
        self.decode(response)?
            .ok_or(CacheError::Rejected { operation: "add" })
    }

    async fn update(&self, id: u64, value: V) -> Result<bool, CacheError> {
        let value = self.codec.encode(&value)?;
        let response = self.client().update(UpdateRequest { id, value }).await?;
        Ok(response.into_inner().value)
    }

    async fn remove(&self, id: u64) -> Result<Option<Entry<u64, V>>, CacheError> {
        let response = self.client().remove(IdRequest { id }).await?;
        self.decode(response)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        if self.client().clear(Empty {}).await?.into_inner().value {
            Ok(())
        } else {
            Err(CacheError::Rejected { operation: "clear" })
        }
    }

    async fn count(&self) -> Result<usize, CacheError> {
        let count = self.client().count(Empty {}).await?.into_inner().count;
        usize::try_from(count).map_err(|_| CacheError::UnexpectedResponse { operation: "count" })
    }

    async fn get(&self, id: Option<u64>) -> Result<Option<Entry<u64, V>>, CacheError> {
        let response = self.client().get_entry(get_request(id)).await?;
        self.decode(response)
    }

    async fn first(&self) -> Result<Option<Entry<u64, V>>, CacheError> {
        let response = self.client().get_first(Empty {}).await?;
        self.decode(response)
    }

    async fn last(&self) -> Result<Option<Entry<u64, V>>, CacheError> {
        let response = self.client().get_last(Empty {}).await?;
        self.decode(response)
    }

    async fn first_id(&self) -> Result<Option<u64>, CacheError> {
        Ok(optional_id(self.client().get_first_id(Empty {}).await?))
    }

    async fn last_id(&self) -> Result<Option<u64>, CacheError> {
        Ok(optional_id(self.client().get_last_id(Empty {}).await?))
    }

    async fn next_after(&self, cursor: Option<u64>) -> Result<Option<Entry<u64, V>>, CacheError> {
        let response = self.client().get_next(get_request(cursor)).await?;
        self.decode(response)
    }

    async fn next_async(&self, cursor: Option<u64>, token: CancellationToken) -> Option<Entry<u64, V>> {
        let mut client = self.client();
        let call = client.get_next_awaiting(get_request(cursor));
        self.wait_for("next_async", call, token).await
    }

    async fn future_first(&self, token: CancellationToken) -> Option<Entry<u64, V>> {
        let mut client = self.client();
        let call = client.get_future_first(Empty {});
        self.wait_for("future_first", call, token).await
    }

    async fn snapshot(&self) -> Result<Snapshot<u64, V>, CacheError> {
        let mut replies = self.client().enumerate(Empty {}).await?.into_inner();
        let mut entries = Vec::new();
        while let Some(reply) = replies.message().await? {
            match reply.item {
                Some(enumerate_reply::Item::Entry(item)) => {
                    if let Some(entry) = decode_entry(self.codec.as_ref(), item)? {
                        entries.push(entry);
                    }
                }
                Some(enumerate_reply::Item::End(end)) => {
                    trace!(entries = entries.len(), truncated = end.truncated, "snapshot received");
                    return Ok(Snapshot {
                        entries,
                        truncated: end.truncated,
                    });
                }
                None => {
                    return Err(CacheError::UnexpectedResponse {
                        operation: "enumerate",
                    });
                }
            }
        }
        Err(CacheError::Transport {
            message: "enumeration ended without an end marker".to_string(),
        })
    }

    async fn tail(&self, cursor: Option<u64>, token: CancellationToken) -> TailStream<u64, V> {
        let request = EnumerateFutureRequest {
            has_cursor: cursor.is_some(),
            cursor: cursor.map(|id| id.to_string()).unwrap_or_default(),
        };
        let mut client = self.client();

        // The server registers the subscription before it answers, so once
        // this resolves no later commit can be missed.
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return futures_util::stream::empty().boxed(),
            opened = client.enumerate_future(request) => opened,
        };
        let mut replies = match opened {
            Ok(response) => response.into_inner(),
            Err(status) => {
                warn!(error = %CacheError::from(status), "remote tail could not be opened");
                return futures_util::stream::empty().boxed();
            }
        };

        let codec = Arc::clone(&self.codec);
        let stream = async_stream::stream! {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    next = replies.message() => Some(next),
                };
                let item = match next {
                    Some(Ok(Some(item))) => item,
                    Some(Ok(None)) | None => break,
                    Some(Err(status)) => {
                        warn!(error = %CacheError::from(status), "remote tail failed");
                        break;
                    }
                };
                match decode_entry(codec.as_ref(), item) {
                    Ok(Some(entry)) => yield entry,
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, "remote tail value could not be decoded");
                        break;
                    }
                }
            }
        };
        Box::pin(stream)
    }
}

impl<V, C> Clone for RemoteOrderedCache<V, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            codec: Arc::clone(&self.codec),
            _marker: PhantomData,
        }
    }
}

impl<V, C> std::fmt::Debug for RemoteOrderedCache<V, C>
where
    C: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteOrderedCache")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}
