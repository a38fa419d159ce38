//! The immutable unit stored, retrieved, and streamed by the cache.

use serde::{Deserialize, Serialize};

/// An immutable `{id, value, created_at}` record.
///
/// `created_at` is the UTC insertion time in nanoseconds since the Unix
/// epoch. An update replaces the value of an existing entry but keeps its
/// identifier and creation time, so the entry keeps its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry<Id, V> {
    id: Id,
    value: V,
    created_at: u64,
}

impl<Id, V> Entry<Id, V> {
    /// Builds an entry from its parts.
    #[must_use]
    #[inline]
    pub fn new(id: Id, value: V, created_at: u64) -> Self {
        Self {
            id,
            value,
            created_at,
        }
    }

    /// The entry identifier.
    #[must_use]
    #[inline]
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// The stored value.
    #[must_use]
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Insertion time in UTC nanoseconds since the Unix epoch.
    #[must_use]
    #[inline]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Consumes the entry, returning its value.
    #[must_use]
    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Consumes the entry, returning its identifier and value.
    #[must_use]
    #[inline]
    pub fn into_parts(self) -> (Id, V) {
        (self.id, self.value)
    }

    /// Returns a copy of this entry carrying `value`, keeping the identifier
    /// and creation time.
    pub(crate) fn with_value(&self, value: V) -> Self
    where
        Id: Clone,
    {
        Self {
            id: self.id.clone(),
            value,
            created_at: self.created_at,
        }
    }
}

/// A finite, ordered copy of the cache contents.
///
/// `truncated` is set when the producer stopped early (for example a server
/// enumeration that ran out of its time budget); `entries` then holds an
/// ordered prefix of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<Id, V> {
    /// Entries in ascending identifier order.
    pub entries: Vec<Entry<Id, V>>,
    /// Whether the enumeration ended before reaching the last entry.
    pub truncated: bool,
}

impl<Id, V> Snapshot<Id, V> {
    /// Number of entries collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entries were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
