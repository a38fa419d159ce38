//! Integration tests for live tails and suspending reads.

use futures_util::StreamExt;
use ordered_cache_rs::{
    CacheConfig, CancellationToken, SequentialCache, filter_values, on_next,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn cache() -> Arc<SequentialCache<u64>> {
    let config = CacheConfig::new()
        .with_l1_caching(true)
        .with_l1_capacity(4, 8);
    Arc::new(SequentialCache::sequential(config).expect("valid config"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tail_sees_every_concurrent_add_in_order() {
    let cache = cache();
    let stop = CancellationToken::new();
    let mut tail = cache.tail(Some(0), stop.clone());

    let writers = 4u64;
    let per_writer = 250u64;
    let handles: Vec<_> = (0..writers)
        .map(|w| {
            let cache = Arc::clone(&cache);
            tokio::task::spawn_blocking(move || {
                for i in 0..per_writer {
                    cache.add(w * per_writer + i).expect("add");
                }
            })
        })
        .collect();

    let total = writers * per_writer;
    let mut expected = 1u64;
    while expected <= total {
        let entry = timeout(WAIT, tail.next())
            .await
            .expect("tail kept up")
            .expect("tail open");
        assert_eq!(*entry.id(), expected);
        expected += 1;
    }
    for handle in handles {
        handle.await.expect("writer");
    }

    stop.cancel();
    assert!(timeout(WAIT, tail.next()).await.expect("tail ended").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn idle_subscriber_does_not_hold_back_another() {
    let cache = cache();
    for i in 0..3 {
        cache.add(i).expect("add");
    }
    let stop = CancellationToken::new();
    let mut idle = cache.tail(Some(0), stop.clone());
    let mut busy = cache.tail(Some(2), stop.clone());

    let added = 200u64;
    for i in 0..added {
        cache.add(100 + i).expect("add");
    }
    let last = 3 + added;

    // `idle` is never polled while `busy` drains everything after its cursor.
    for expected in 3..=last {
        let entry = timeout(WAIT, busy.next())
            .await
            .expect("busy kept up")
            .expect("busy open");
        assert_eq!(*entry.id(), expected);
    }

    let ids: Vec<u64> = timeout(
        WAIT,
        idle.by_ref()
            .take(last as usize)
            .map(|e| *e.id())
            .collect::<Vec<_>>(),
    )
    .await
    .expect("idle caught up");
    assert_eq!(ids, (1..=last).collect::<Vec<_>>());

    stop.cancel();
    assert!(timeout(WAIT, busy.next()).await.expect("ended").is_none());
    assert!(timeout(WAIT, idle.next()).await.expect("ended").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn live_tail_opened_during_writes_sees_a_gap_free_run() {
    for _round in 0..10 {
        let cache = cache();
        // Highest id whose `add` has returned.
        let acked = Arc::new(AtomicU64::new(0));
        let writers = 4u64;
        let per_writer = 100u64;
        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let cache = Arc::clone(&cache);
                let acked = Arc::clone(&acked);
                tokio::task::spawn_blocking(move || {
                    for i in 0..per_writer {
                        let id = *cache.add(w * per_writer + i).expect("add").id();
                        acked.fetch_max(id, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        tokio::task::yield_now().await;
        let before = acked.load(Ordering::SeqCst);
        let stop = CancellationToken::new();
        let mut tail = cache.tail(None, stop.clone());
        let after = cache.last_id().unwrap_or(0);

        for handle in handles {
            handle.await.expect("writer");
        }
        // Guarantees at least one entry after the open, whoever won the race.
        let sentinel = *cache.add(u64::MAX).expect("add").id();

        let mut received = Vec::new();
        while received.last() != Some(&sentinel) {
            let entry = timeout(WAIT, tail.next())
                .await
                .expect("tail kept up")
                .expect("tail open");
            received.push(*entry.id());
        }

        let first = received[0];
        assert!(first > before, "replayed history: {first} <= {before}");
        assert!(first <= after + 1, "missed entries committed after open");
        let expected: Vec<u64> = (first..=sentinel).collect();
        assert_eq!(received, expected);

        stop.cancel();
    }
}

#[tokio::test]
async fn cursor_tail_replays_existing_entries() {
    let cache = cache();
    for i in 0..5 {
        cache.add(i).expect("add");
    }
    let stop = CancellationToken::new();
    let mut tail = cache.tail(Some(2), stop.clone());

    let mut replayed = Vec::new();
    for _ in 0..3 {
        let entry = timeout(WAIT, tail.next()).await.expect("entry").expect("open");
        replayed.push(*entry.id());
    }
    assert_eq!(replayed, vec![3, 4, 5]);

    cache.add(99).expect("add");
    let live = timeout(WAIT, tail.next()).await.expect("entry").expect("open");
    assert_eq!((*live.id(), *live.value()), (6, 99));
}

#[tokio::test]
async fn live_tail_skips_existing_entries() {
    let cache = cache();
    cache.add(1).expect("add");
    cache.add(2).expect("add");

    let stop = CancellationToken::new();
    let mut tail = cache.tail(None, stop.clone());
    cache.add(3).expect("add");

    let entry = timeout(WAIT, tail.next()).await.expect("entry").expect("open");
    assert_eq!(*entry.id(), 3);
}

#[tokio::test]
async fn cancelled_tail_ends() {
    let cache = cache();
    let stop = CancellationToken::new();
    let mut tail = cache.tail(None, stop.clone());

    let canceller = {
        let stop = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stop.cancel();
        })
    };
    assert!(timeout(WAIT, tail.next()).await.expect("ended").is_none());
    canceller.await.expect("canceller");

    // Already cancelled tokens end a new tail immediately, even with data.
    cache.add(1).expect("add");
    let mut late = cache.tail(Some(0), stop.clone());
    assert!(late.next().await.is_none());
}

#[tokio::test]
async fn tail_restarts_after_clear() {
    let cache = cache();
    for i in 0..3 {
        cache.add(i).expect("add");
    }
    let stop = CancellationToken::new();
    let mut tail = cache.tail(Some(3), stop.clone());

    cache.clear().expect("clear");
    cache.add(10).expect("add");

    let entry = timeout(WAIT, tail.next()).await.expect("entry").expect("open");
    assert_eq!((*entry.id(), *entry.value()), (1, 10));
}

#[tokio::test]
async fn next_async_waits_for_the_successor() {
    let cache = cache();
    cache.add(1).expect("add");

    let present = cache
        .next_async(None, CancellationToken::new())
        .await
        .expect("first entry");
    assert_eq!(*present.id(), 1);

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.next_async(Some(1), CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.add(2).expect("add");

    let next = timeout(WAIT, waiter)
        .await
        .expect("woken")
        .expect("task")
        .expect("entry");
    assert_eq!(*next.id(), 2);
}

#[tokio::test]
async fn next_async_returns_none_on_cancel() {
    let cache = cache();
    let stop = CancellationToken::new();
    let waiter = {
        let cache = Arc::clone(&cache);
        let token = stop.clone();
        tokio::spawn(async move { cache.next_async(Some(5), token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    stop.cancel();
    assert!(timeout(WAIT, waiter).await.expect("woken").expect("task").is_none());
}

#[tokio::test]
async fn future_first_ignores_existing_entries() {
    let cache = cache();
    cache.add(1).expect("add");

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.future_first(CancellationToken::new()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    cache.add(2).expect("add");

    let entry = timeout(WAIT, waiter)
        .await
        .expect("woken")
        .expect("task")
        .expect("entry");
    assert_eq!(*entry.id(), 2);
}

#[tokio::test]
async fn on_next_stops_when_handler_declines() {
    let cache = cache();
    for i in 0..10 {
        cache.add(i).expect("add");
    }
    let tail = cache.tail(Some(0), CancellationToken::new());
    let mut seen = Vec::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = on_next(tail, move |entry| {
        let _ = tx.send(*entry.id());
        *entry.id() < 3
    });

    let delivered = timeout(WAIT, handle).await.expect("finished").expect("task");
    assert_eq!(delivered, 3);
    while let Ok(id) = rx.try_recv() {
        seen.push(id);
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

#[tokio::test]
async fn filter_values_retypes_matching_entries() {
    let cache = cache();
    for i in 1..=6 {
        cache.add(i).expect("add");
    }
    let stop = CancellationToken::new();
    let evens = filter_values(cache.tail(Some(0), stop.clone()), |v| {
        (v % 2 == 0).then(|| format!("even-{v}"))
    });
    let collected: Vec<_> = timeout(WAIT, evens.take(3).collect::<Vec<_>>())
        .await
        .expect("collected");
    let values: Vec<&str> = collected.iter().map(|e| e.value().as_str()).collect();
    assert_eq!(values, vec!["even-2", "even-4", "even-6"]);
    assert_eq!(
        collected.iter().map(|e| *e.id()).collect::<Vec<_>>(),
        vec![2, 4, 6]
    );
}
