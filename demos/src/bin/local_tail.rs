// demos/src/bin/local_tail.rs
//
// This demo shows the local ordered cache with a bounded fast tier:
// - sequential identifiers and positional queries
// - reads that fall back to the authoritative tier after eviction
// - a live tail fed by concurrent writers, stopped by cancellation
//
// Run this demo with:
//   cargo run --bin local_tail
//   (from the demos directory)

use futures_util::StreamExt;
use ordered_cache_rs::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    info!("Ordered Cache Local Tail Demo");

    let config = CacheConfig::new()
        .with_l1_caching(true)
        .with_l1_capacity(4, 8);
    let cache = match SequentialCache::<String>::sequential(config) {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!(error = %e, "could not build cache");
            return;
        }
    };

    demo_positional_queries(&cache);
    demo_live_tail(Arc::clone(&cache)).await;
}

fn demo_positional_queries(cache: &SequentialCache<String>) {
    info!("\n=== Positional Queries ===");
    for word in ["alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa"] {
        if let Err(e) = cache.add(word.to_string()) {
            warn!(error = %e, "add failed");
        }
    }
    info!(count = cache.count(), first = ?cache.first_id(), last = ?cache.last_id(), "bounds");

    // Entry 1 was evicted from the fast tier long ago.
    if let Some(entry) = cache.get(Some(1)) {
        info!(id = entry.id(), value = %entry.value(), "oldest entry");
    }
    if let Some(entry) = cache.next_after(Some(5)) {
        info!(id = entry.id(), value = %entry.value(), "after 5");
    }
}

async fn demo_live_tail(cache: Arc<SequentialCache<String>>) {
    info!("\n=== Live Tail ===");
    let stop = CancellationToken::new();
    let mut tail = cache.tail(cache.last_id(), stop.clone());

    let writers: Vec<_> = (0..3)
        .map(|w| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..5 {
                    if let Err(e) = cache.add(format!("writer{w}-{i}")) {
                        warn!(error = %e, "add failed");
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
        })
        .collect();

    let mut received = 0;
    while received < 15 {
        match tail.next().await {
            Some(entry) => {
                info!(id = entry.id(), value = %entry.value(), "tailed");
                received += 1;
            }
            None => break,
        }
    }
    for writer in writers {
        let _ = writer.await;
    }

    stop.cancel();
    info!(ended = tail.next().await.is_none(), "tail after cancel");
}
