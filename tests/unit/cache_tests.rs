//! Integration tests for the local ordered cache.

use ordered_cache_rs::{
    CacheConfig, CacheError, Entry, MemoryStore, OrderedCache, SequentialCache,
    SequentialIdGenerator, Store, TimeOrderedCache,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn tiered(min: usize, max: usize) -> SequentialCache<String> {
    let config = CacheConfig::new()
        .with_l1_caching(true)
        .with_l1_capacity(min, max);
    SequentialCache::sequential(config).expect("valid config")
}

fn ids<V>(entries: &[Entry<u64, V>]) -> Vec<u64> {
    entries.iter().map(|e| *e.id()).collect()
}

// ---------------------------------------------------------------------------
// Basic operations
// ---------------------------------------------------------------------------

#[test]
fn add_get_remove_walkthrough() {
    let cache = tiered(2, 4);

    for i in 1..=10u64 {
        let entry = cache.add(format!("v{i}")).expect("add");
        assert_eq!(*entry.id(), i);
    }
    assert_eq!(cache.count(), 10);
    assert_eq!(cache.first_id(), Some(1));
    assert_eq!(cache.last_id(), Some(10));

    // Older entries have left L1 but are still served from L2.
    for i in 1..=10u64 {
        let entry = cache.get(Some(i)).expect("entry present");
        assert_eq!(entry.value(), &format!("v{i}"));
    }

    let removed = cache.remove(5).expect("remove").expect("entry existed");
    assert_eq!(removed.value(), "v5");
    assert!(cache.get(Some(5)).is_none());
    assert_eq!(cache.next_after(Some(4)).map(|e| *e.id()), Some(6));
    assert_eq!(cache.count(), 9);

    assert!(cache.remove(5).expect("remove").is_none());
    assert!(cache.get(None).is_none());
}

#[test]
fn removing_the_bounds_moves_the_metadata() {
    let cache = tiered(2, 4);
    for i in 0..5 {
        cache.add(format!("v{i}")).expect("add");
    }

    cache.remove(1).expect("remove");
    assert_eq!(cache.first_id(), Some(2));
    cache.remove(5).expect("remove");
    assert_eq!(cache.last_id(), Some(4));
    assert_eq!(cache.last().map(|e| *e.id()), Some(4));

    // Identifiers keep increasing after the last entry is removed.
    assert_eq!(*cache.add("next".to_string()).expect("add").id(), 6);
}

#[test]
fn update_keeps_identity_in_both_tiers() {
    let cache = tiered(1, 2);
    let old = cache.add("old".to_string()).expect("add");
    cache.add("middle".to_string()).expect("add");
    cache.add("newer".to_string()).expect("add");
    let recent = cache.add("recent".to_string()).expect("add");

    assert!(cache.update(*old.id(), "old2".to_string()).expect("update"));
    assert!(cache.update(*recent.id(), "recent2".to_string()).expect("update"));
    assert!(!cache.update(99, "ghost".to_string()).expect("update"));

    let fetched = cache.get(Some(*old.id())).expect("present");
    assert_eq!(fetched.value(), "old2");
    assert_eq!(fetched.created_at(), old.created_at());
    assert_eq!(cache.get(Some(*recent.id())).expect("present").value(), "recent2");
    assert_eq!(cache.count(), 4);
}

#[test]
fn clear_restarts_numbering() {
    let cache = tiered(2, 4);
    for i in 0..6 {
        cache.add(format!("v{i}")).expect("add");
    }
    cache.clear().expect("clear");

    assert_eq!(cache.count(), 0);
    assert!(cache.first().is_none());
    assert!(cache.last().is_none());
    assert_eq!(cache.first_id(), None);
    assert_eq!(cache.last_id(), None);
    assert_eq!(*cache.add("fresh".to_string()).expect("add").id(), 1);
}

#[test]
fn next_after_walks_every_entry_once() {
    let cache = tiered(3, 5);
    for i in 0..20 {
        cache.add(format!("v{i}")).expect("add");
    }
    for id in [3, 4, 10, 17] {
        cache.remove(id).expect("remove");
    }

    let mut walked = Vec::new();
    let mut cursor = None;
    while let Some(entry) = cache.next_after(cursor) {
        cursor = Some(*entry.id());
        walked.push(*entry.id());
    }
    let expected: Vec<u64> = (1..=20).filter(|id| ![3, 4, 10, 17].contains(id)).collect();
    assert_eq!(walked, expected);

    // A cursor that was never stored still finds its successor.
    assert_eq!(cache.next_after(Some(3)).map(|e| *e.id()), Some(5));
    assert!(cache.next_after(Some(20)).is_none());
}

#[test]
fn snapshot_matches_iteration() {
    let cache = tiered(2, 3);
    for i in 0..8 {
        cache.add(format!("v{i}")).expect("add");
    }
    cache.remove(2).expect("remove");

    let snapshot = cache.snapshot();
    assert!(!snapshot.truncated);
    assert_eq!(ids(&snapshot.entries), vec![1, 3, 4, 5, 6, 7, 8]);
    assert_eq!(
        ids(&cache.iter().collect::<Vec<_>>()),
        ids(&snapshot.entries)
    );
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[test]
fn invalid_capacity_is_rejected() {
    let config = CacheConfig::new()
        .with_l1_caching(true)
        .with_l1_capacity(10, 5);
    let result = SequentialCache::<String>::sequential(config);
    assert!(matches!(
        result,
        Err(CacheError::InvalidConfiguration { .. })
    ));
}

#[test]
fn capacity_is_checked_without_l1() {
    let config = CacheConfig::new().with_l1_capacity(0, 5);
    let result = SequentialCache::<String>::sequential(config);
    assert!(matches!(
        result,
        Err(CacheError::InvalidConfiguration { .. })
    ));
}

#[test]
fn prepopulated_authoritative_tier_is_recovered() {
    let l2: Arc<dyn Store<u64, String>> = Arc::new(MemoryStore::unbounded());
    for id in [4u64, 7, 9] {
        l2.insert(Entry::new(id, format!("v{id}"), 0));
    }

    let cache = OrderedCache::with_stores(
        CacheConfig::default(),
        SequentialIdGenerator::new(),
        None,
        Arc::clone(&l2),
    )
    .expect("valid config");

    assert_eq!(cache.count(), 3);
    assert_eq!(cache.first_id(), Some(4));
    assert_eq!(cache.last_id(), Some(9));
    assert_eq!(*cache.add("ten".to_string()).expect("add").id(), 10);
    assert_eq!(l2.len(), 4);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_adds_issue_distinct_increasing_ids() {
    let cache = Arc::new(tiered(16, 64));
    let threads = 8;
    let per_thread = 200;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let mut issued = Vec::with_capacity(per_thread);
                for i in 0..per_thread {
                    let entry = cache.add(format!("{t}-{i}")).expect("add");
                    issued.push(*entry.id());
                }
                issued
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        let issued = handle.join().expect("writer thread");
        assert!(issued.windows(2).all(|w| w[0] < w[1]));
        all.extend(issued);
    }

    let total = threads * per_thread;
    assert_eq!(all.len(), total);
    assert_eq!(cache.count(), total);
    assert_eq!(cache.first_id(), Some(1));
    assert_eq!(cache.last_id(), Some(total as u64));

    let walked = ids(&cache.iter().collect::<Vec<_>>());
    assert_eq!(walked, (1..=total as u64).collect::<Vec<_>>());
}

#[test]
fn readers_never_miss_entries_during_eviction() {
    let cache = Arc::new(tiered(2, 4));
    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for i in 0..500 {
                cache.add(format!("v{i}")).expect("add");
            }
        })
    };

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let mut cursor = None;
            let mut seen = 0u64;
            while seen < 500 {
                if let Some(entry) = cache.next_after(cursor) {
                    assert_eq!(*entry.id(), seen + 1);
                    cursor = Some(*entry.id());
                    seen += 1;
                } else {
                    thread::yield_now();
                }
            }
        })
    };

    writer.join().expect("writer");
    reader.join().expect("reader");
}

#[test]
fn time_ordered_ids_sort_by_insertion() {
    let cache = TimeOrderedCache::<u32>::time_ordered(CacheConfig::default()).expect("config");
    let mut issued = Vec::new();
    for i in 0..1_000 {
        issued.push(*cache.add(i).expect("add").id());
    }
    assert!(issued.windows(2).all(|w| w[0] < w[1]));
    assert!(issued.iter().all(|id| id.get_version_num() == 7));
    assert_eq!(cache.first_id(), issued.first().copied());
    assert_eq!(cache.last_id(), issued.last().copied());
}
