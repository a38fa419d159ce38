use criterion::{BenchmarkId, Criterion};
use ordered_cache_rs::{CacheConfig, SequentialCache};
use std::hint::black_box;

fn populated(count: u64, l1: bool) -> SequentialCache<u64> {
    let config = CacheConfig::new()
        .with_l1_caching(l1)
        .with_l1_capacity(1_024, 4_096);
    let cache = SequentialCache::sequential(config).expect("bench config must be valid");
    for i in 0..count {
        let _ = cache.add(i);
    }
    cache
}

pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("OrderedCache - Reads");

    for &count in &[1_000u64, 100_000] {
        let cache = populated(count, true);

        group.bench_with_input(BenchmarkId::new("get_recent", count), &count, |b, &count| {
            b.iter(|| black_box(cache.get(Some(count))))
        });

        group.bench_with_input(BenchmarkId::new("get_oldest", count), &count, |b, _| {
            b.iter(|| black_box(cache.get(Some(1))))
        });

        group.bench_with_input(BenchmarkId::new("next_after_walk", count), &count, |b, _| {
            b.iter(|| {
                let mut cursor = None;
                let mut walked = 0u64;
                while let Some(entry) = cache.next_after(cursor) {
                    cursor = Some(*entry.id());
                    walked += 1;
                }
                black_box(walked)
            })
        });

        group.bench_with_input(BenchmarkId::new("snapshot", count), &count, |b, _| {
            b.iter(|| black_box(cache.snapshot()))
        });
    }

    let cache = populated(10_000, false);
    group.bench_function("bounds_lookup", |b| {
        b.iter(|| black_box((cache.first_id(), cache.last_id())))
    });

    group.finish();
}
