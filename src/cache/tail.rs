//! Live tail subscriptions.
//!
//! A tail is an unbounded stream of entries appended after a cursor. Each
//! subscriber keeps a private cursor and pulls successors straight from the
//! cache tiers; writers only publish a [`Signal`] on a `watch` channel after
//! every commit. Nothing is queued per subscriber, so a slow consumer never
//! holds up a writer or another subscriber, and lag costs no memory.
//!
//! Wake-ups cannot be lost: a subscriber marks the latest signal as seen
//! *before* looking for a successor, and a writer publishes *after* the entry
//! is visible in the tiers. Either the lookup finds the entry, or the
//! subscriber's `changed()` fires for it. Delivery is in identifier order and
//! the cursor only moves forward, so no entry is delivered twice.
//!
//! `clear` advances the signal epoch. A subscriber that sees a new epoch
//! restarts from the first entry of that epoch, since identifiers may start
//! over after a clear.

use crate::cache::entry::Entry;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// A live stream of entries; ends only when its token is cancelled (or, for
/// remote tails, when the connection fails).
pub type TailStream<Id, V> = BoxStream<'static, Entry<Id, V>>;

/// The value writers publish after each commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Signal<Id> {
    /// Incremented by every `clear`.
    pub epoch: u64,
    /// Identifier of the last committed entry in this epoch.
    pub last: Option<Id>,
}

impl<Id> Signal<Id> {
    pub(crate) fn new(last: Option<Id>) -> Self {
        Self { epoch: 0, last }
    }
}

/// Where a new subscription begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TailStart<Id> {
    /// From the first entry present, including existing ones.
    Beginning,
    /// Strictly after this identifier.
    After(Id),
    /// Strictly after the last entry committed when the subscription opens.
    Live,
}

/// What a tail pulls from.
pub(crate) trait TailSource<Id, V>: Send + Sync + 'static {
    /// The entry following `cursor`, or the first entry for `None`.
    fn successor(&self, cursor: Option<Id>) -> Option<Entry<Id, V>>;

    /// A receiver positioned at the latest signal.
    fn subscribe(&self) -> watch::Receiver<Signal<Id>>;
}

struct Cursor<Id, S> {
    source: Arc<S>,
    rx: watch::Receiver<Signal<Id>>,
    position: Option<Id>,
    epoch: u64,
    token: CancellationToken,
}

/// Opens a subscription on `source`.
pub(crate) fn follow<Id, V, S>(
    source: Arc<S>,
    start: TailStart<Id>,
    token: CancellationToken,
) -> TailStream<Id, V>
where
    Id: Copy + Ord + Send + Sync + 'static,
    V: Send + 'static,
    S: TailSource<Id, V>,
{
    let rx = source.subscribe();
    let opened = *rx.borrow();
    let position = match start {
        TailStart::Beginning => None,
        TailStart::After(id) => Some(id),
        TailStart::Live => opened.last,
    };
    let cursor = Cursor {
        source,
        rx,
        position,
        epoch: opened.epoch,
        token,
    };
    stream::unfold(cursor, |mut cursor| async move {
        let entry = cursor.advance().await?;
        Some((entry, cursor))
    })
    .boxed()
}

impl<Id, S> Cursor<Id, S>
where
    Id: Copy + Ord + Send + Sync + 'static,
{
    async fn advance<V>(&mut self) -> Option<Entry<Id, V>>
    where
        S: TailSource<Id, V>,
    {
        loop {
            if self.token.is_cancelled() {
                return None;
            }

            let seen = *self.rx.borrow_and_update();
            if seen.epoch != self.epoch {
                trace!(epoch = seen.epoch, "tail restarting after clear");
                self.epoch = seen.epoch;
                self.position = None;
            }

            let candidate = self.source.successor(self.position);

            // A clear may have landed between the two reads; the candidate
            // then belongs to either epoch.
            if self.rx.borrow().epoch != self.epoch {
                continue;
            }

            if let Some(entry) = candidate {
                self.position = Some(*entry.id());
                return Some(entry);
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => return None,
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }
}

/// Drives `stream` on a spawned task, calling `handler` for every entry until
/// it returns `false` or the stream ends. Resolves to the number of entries
/// handed to `handler`.
pub fn on_next<Id, V, F>(mut stream: TailStream<Id, V>, mut handler: F) -> JoinHandle<usize>
where
    Id: Send + 'static,
    V: Send + 'static,
    F: FnMut(Entry<Id, V>) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(entry) = stream.next().await {
            delivered += 1;
            if !handler(entry) {
                break;
            }
        }
        delivered
    })
}

/// Keeps the entries whose value `f` maps to `Some`, re-typing their values.
pub fn filter_values<Id, V, U, F>(stream: TailStream<Id, V>, mut f: F) -> TailStream<Id, U>
where
    Id: Send + 'static,
    V: Send + 'static,
    U: Send + 'static,
    F: FnMut(V) -> Option<U> + Send + 'static,
{
    stream
        .filter_map(move |entry| {
            let created_at = entry.created_at();
            let (id, value) = entry.into_parts();
            let mapped = f(value).map(|value| Entry::new(id, value, created_at));
            futures_util::future::ready(mapped)
        })
        .boxed()
}
