//! First/last identifier index of the authoritative tier.

use crate::cache::store::Store;
use crossbeam::atomic::AtomicCell;

/// Identifier boundaries of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds<Id> {
    /// Lowest identifier present, if any.
    pub first: Option<Id>,
    /// Highest identifier present, if any.
    pub last: Option<Id>,
}

impl<Id> Bounds<Id> {
    const EMPTY: Self = Self {
        first: None,
        last: None,
    };
}

/// Tracks [`Bounds`] without scanning the store.
///
/// Both boundaries are published together through one [`AtomicCell`], so a
/// reader never sees a first id from one write paired with a last id from
/// another. Only the cache writer (which holds the writer lock) mutates it.
pub struct Metadata<Id> {
    bounds: AtomicCell<Bounds<Id>>,
}

impl<Id: Copy + Ord> Metadata<Id> {
    /// An index for an empty store.
    pub fn new() -> Self {
        Self {
            bounds: AtomicCell::new(Bounds::EMPTY),
        }
    }

    /// An index describing the current contents of `store`.
    pub fn from_store<V, S: Store<Id, V> + ?Sized>(store: &S) -> Self {
        Self {
            bounds: AtomicCell::new(Bounds {
                first: store.first_id(),
                last: store.last_id(),
            }),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Bounds<Id> {
        self.bounds.load()
    }

    #[inline]
    pub fn first_id(&self) -> Option<Id> {
        self.bounds.load().first
    }

    #[inline]
    pub fn last_id(&self) -> Option<Id> {
        self.bounds.load().last
    }

    /// Records an appended identifier.
    pub fn record_add(&self, id: Id) {
        let current = self.bounds.load();
        self.bounds.store(Bounds {
            first: Some(current.first.unwrap_or(id)),
            last: Some(id),
        });
    }

    /// Records a removal, re-reading a boundary from `store` only when the
    /// removed identifier was that boundary.
    pub fn record_remove<V, S: Store<Id, V> + ?Sized>(&self, removed: Id, store: &S) {
        let current = self.bounds.load();
        let first = if current.first == Some(removed) {
            store.first_id()
        } else {
            current.first
        };
        let last = if current.last == Some(removed) {
            store.last_id()
        } else {
            current.last
        };
        if first.is_none() || last.is_none() {
            self.bounds.store(Bounds::EMPTY);
        } else {
            self.bounds.store(Bounds { first, last });
        }
    }

    /// Forgets both boundaries.
    pub fn reset(&self) {
        self.bounds.store(Bounds::EMPTY);
    }
}

impl<Id: Copy + Ord> Default for Metadata<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: Copy + std::fmt::Debug> std::fmt::Debug for Metadata<Id> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metadata")
            .field("bounds", &self.bounds.load())
            .finish()
    }
}
