/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! gRPC service exposing a local cache.
//!
//! [`CacheServer`] implements the generated [`CacheService`] trait by
//! calling one [`SequentialCache`] directly. When a client drops a call,
//! tonic drops the handler future or the response stream with it, which ends
//! any pending wait or live tail. The shutdown token ends them all at once so
//! graceful shutdown does not wait on open tails.
//!
//! Failed operations answer with a gRPC status; only genuine misses answer
//! with `has_value == false`.

use crate::cache::entry::Entry;
use crate::cache::error::CacheError;
use crate::cache::ordered::SequentialCache;
use crate::remote::proto::cache_service_server::{CacheService, CacheServiceServer};
use crate::remote::proto::{
    AddRequest, BoolResponse, CountResponse, Empty, EntryResponse, EnumerateEnd,
    EnumerateFutureRequest, EnumerateReply, GetRequest, IdRequest, IdResponse, UpdateRequest,
    enumerate_reply,
};
use futures_util::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, trace, warn};

/// Default time budget for draining a snapshot enumeration.
pub const DEFAULT_ENUMERATE_BUDGET: Duration = Duration::from_secs(5);

/// Default number of entries collected between cooperative yields.
pub const DEFAULT_ENUMERATE_YIELD_EVERY: usize = 256;

type ReplyStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// Server tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Time allowed for collecting an `Enumerate` snapshot. Whatever was
    /// collected when it runs out is sent, followed by a truncated end marker.
    pub enumerate_budget: Duration,
    /// Entries collected between yields to the runtime; the budget is checked
    /// at each yield.
    pub enumerate_yield_every: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enumerate_budget: DEFAULT_ENUMERATE_BUDGET,
            enumerate_yield_every: DEFAULT_ENUMERATE_YIELD_EVERY,
        }
    }
}

impl ServerConfig {
    /// Sets the snapshot time budget.
    #[must_use]
    #[inline]
    pub fn with_enumerate_budget(mut self, budget: Duration) -> Self {
        self.enumerate_budget = budget;
        self
    }

    /// Sets how many entries are collected between yields (at least one).
    #[must_use]
    #[inline]
    pub fn with_enumerate_yield_every(mut self, entries: usize) -> Self {
        self.enumerate_yield_every = entries.max(1);
        self
    }
}

/// Answers remote cache calls from one local [`SequentialCache`].
pub struct CacheServer {
    cache: Arc<SequentialCache<Vec<u8>>>,
    config: ServerConfig,
    shutdown: CancellationToken,
}

impl CacheServer {
    /// A server over `cache`.
    #[must_use]
    pub fn new(cache: Arc<SequentialCache<Vec<u8>>>, config: ServerConfig) -> Self {
        Self {
            cache,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stops [`serve`](Self::serve) and ends pending waits and live tails
    /// once `token` is cancelled.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// The cache being served.
    #[must_use]
    pub fn cache(&self) -> &Arc<SequentialCache<Vec<u8>>> {
        &self.cache
    }

    /// The server tuning.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Wraps the server as a tonic service, for hosts that build their own
    /// router.
    #[must_use]
    pub fn into_service(self) -> CacheServiceServer<Self> {
        CacheServiceServer::new(self)
    }

    /// Serves connections accepted on `listener` until the shutdown token
    /// fires, then drains in-flight calls.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Transport`] when the HTTP/2 server fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), CacheError> {
        match listener.local_addr() {
            Ok(addr) => info!(%addr, "cache server listening"),
            Err(e) => info!(error = %e, "cache server listening on unknown address"),
        }
        let shutdown = self.shutdown.clone();
        let incoming = TcpListenerStream::new(listener).map(|accepted| {
            if let Ok(stream) = &accepted {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(error = %e, "could not disable nagle");
                }
            }
            accepted
        });

        Server::builder()
            .add_service(self.into_service())
            .serve_with_incoming_shutdown(incoming, shutdown.cancelled_owned())
            .await?;
        info!("cache server stopped");
        Ok(())
    }

    /// Collects the current contents until the time budget runs out. The
    /// flag is `true` when entries were left behind.
    async fn collect_snapshot(&self) -> (Vec<Entry<u64, Vec<u8>>>, bool) {
        let deadline = Instant::now() + self.config.enumerate_budget;
        let yield_every = self.config.enumerate_yield_every.max(1);
        let mut entries = Vec::new();
        let mut iter = self.cache.iter().peekable();
        let mut since_yield = 0usize;

        while let Some(entry) = iter.next() {
            entries.push(entry);
            since_yield += 1;
            if since_yield >= yield_every {
                since_yield = 0;
                if Instant::now() >= deadline && iter.peek().is_some() {
                    warn!(
                        collected = entries.len(),
                        budget_ms = self.config.enumerate_budget.as_millis() as u64,
                        "enumeration budget exhausted, sending partial snapshot"
                    );
                    return (entries, true);
                }
                tokio::task::yield_now().await;
            }
        }
        (entries, false)
    }

    fn waited(&self, found: Option<Entry<u64, Vec<u8>>>) -> Result<Response<EntryResponse>, Status> {
        match found {
            Some(entry) => Ok(Response::new(entry_response(&entry))),
            None if self.shutdown.is_cancelled() => {
                Err(Status::unavailable("cache server shutting down"))
            }
            None => Ok(Response::new(missing())),
        }
    }
}

#[tonic::async_trait]
impl CacheService for CacheServer {
    async fn add(&self, request: Request<AddRequest>) -> Result<Response<EntryResponse>, Status> {
        let entry = self
            .cache
            .add(request.into_inner().value)
            .map_err(|e| failed("add", e))?;
        Ok(Response::new(entry_response(&entry)))
    }

    async fn update(
        &self,
        request: Request<UpdateRequest>,
    ) -> Result<Response<BoolResponse>, Status> {
        let UpdateRequest { id, value } = request.into_inner();
        let value = self.cache.update(id, value).map_err(|e| failed("update", e))?;
        Ok(Response::new(BoolResponse { value }))
    }

    async fn remove(&self, request: Request<IdRequest>) -> Result<Response<EntryResponse>, Status> {
        let removed = self
            .cache
            .remove(request.into_inner().id)
            .map_err(|e| failed("remove", e))?;
        Ok(Response::new(optional_entry(removed)))
    }

    async fn clear(&self, _request: Request<Empty>) -> Result<Response<BoolResponse>, Status> {
        self.cache.clear().map_err(|e| failed("clear", e))?;
        Ok(Response::new(BoolResponse { value: true }))
    }

    async fn count(&self, _request: Request<Empty>) -> Result<Response<CountResponse>, Status> {
        Ok(Response::new(CountResponse {
            count: self.cache.count() as u64,
        }))
    }

    async fn get_entry(
        &self,
        request: Request<GetRequest>,
    ) -> Result<Response<EntryResponse>, Status> {
        let GetRequest { has_id, id } = request.into_inner();
        Ok(Response::new(optional_entry(
            self.cache.get(has_id.then_some(id)),
        )))
    }

    async fn get_first(&self, _request: Request<Empty>) -> Result<Response<EntryResponse>, Status> {
        Ok(Response::new(optional_entry(self.cache.first())))
    }

    async fn get_first_id(&self, _request: Request<Empty>) -> Result<Response<IdResponse>, Status> {
        Ok(Response::new(id_response(self.cache.first_id())))
    }

    async fn get_last(&self, _request: Request<Empty>) -> Result<Response<EntryResponse>, Status> {
        Ok(Response::new(optional_entry(self.cache.last())))
    }

    async fn get_last_id(&self, _request: Request<Empty>) -> Result<Response<IdResponse>, Status> {
        Ok(Response::new(id_response(self.cache.last_id())))
    }

    async fn get_next(
        &self,
        request: Request<GetRequest>,
    ) -> Result<Response<EntryResponse>, Status> {
        let GetRequest { has_id, id } = request.into_inner();
        Ok(Response::new(optional_entry(
            self.cache.next_after(has_id.then_some(id)),
        )))
    }

    async fn get_next_awaiting(
        &self,
        request: Request<GetRequest>,
    ) -> Result<Response<EntryResponse>, Status> {
        let GetRequest { has_id, id } = request.into_inner();
        let found = self
            .cache
            .next_async(has_id.then_some(id), self.shutdown.child_token())
            .await;
        self.waited(found)
    }

    async fn get_future_first(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<EntryResponse>, Status> {
        let found = self.cache.future_first(self.shutdown.child_token()).await;
        self.waited(found)
    }

    type EnumerateStream = ReplyStream<EnumerateReply>;

    async fn enumerate(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<Self::EnumerateStream>, Status> {
        let (entries, truncated) = self.collect_snapshot().await;
        debug!(entries = entries.len(), truncated, "enumeration collected");

        let items = entries.into_iter().map(|entry| {
            Ok::<_, Status>(EnumerateReply {
                item: Some(enumerate_reply::Item::Entry(entry_response(&entry))),
            })
        });
        let end = Ok::<_, Status>(EnumerateReply {
            item: Some(enumerate_reply::Item::End(EnumerateEnd { truncated })),
        });
        let replies = futures_util::stream::iter(items.chain(std::iter::once(end)));
        Ok(Response::new(Box::pin(replies)))
    }

    type EnumerateFutureStream = ReplyStream<EntryResponse>;

    async fn enumerate_future(
        &self,
        request: Request<EnumerateFutureRequest>,
    ) -> Result<Response<Self::EnumerateFutureStream>, Status> {
        let EnumerateFutureRequest { has_cursor, cursor } = request.into_inner();
        let cursor = if has_cursor {
            let parsed = cursor.parse::<u64>().map_err(|_| {
                Status::invalid_argument(format!("cursor {cursor:?} is not an identifier"))
            })?;
            Some(parsed)
        } else {
            None
        };

        // The subscription is registered here, before the response headers
        // reach the client.
        let tail = self.cache.tail(cursor, self.shutdown.child_token());
        trace!(?cursor, "live tail opened");
        let replies = tail.map(|entry| Ok::<_, Status>(entry_response(&entry)));
        Ok(Response::new(Box::pin(replies)))
    }
}

impl fmt::Debug for CacheServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheServer")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn entry_response(entry: &Entry<u64, Vec<u8>>) -> EntryResponse {
    EntryResponse {
        id: *entry.id(),
        created_at_utc_ns: entry.created_at(),
        value: entry.value().clone(),
        has_value: true,
    }
}

fn missing() -> EntryResponse {
    EntryResponse {
        id: 0,
        created_at_utc_ns: 0,
        value: Vec::new(),
        has_value: false,
    }
}

fn optional_entry(entry: Option<Entry<u64, Vec<u8>>>) -> EntryResponse {
    entry.as_ref().map_or_else(missing, entry_response)
}

fn id_response(id: Option<u64>) -> IdResponse {
    IdResponse {
        id: id.unwrap_or_default(),
        has_value: id.is_some(),
    }
}

fn failed(op: &str, err: CacheError) -> Status {
    warn!(op, error = %err, "request failed");
    Status::from(err)
}
