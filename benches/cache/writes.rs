use criterion::{BenchmarkId, Criterion};
use ordered_cache_rs::{CacheConfig, SequentialCache, TimeOrderedCache};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

fn sequential(l1: bool) -> SequentialCache<u64> {
    let config = CacheConfig::new()
        .with_l1_caching(l1)
        .with_l1_capacity(1_024, 4_096);
    SequentialCache::sequential(config).expect("bench config must be valid")
}

pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("OrderedCache - Writes");

    for l1 in [false, true] {
        group.bench_with_input(BenchmarkId::new("add_sequential", l1), &l1, |b, &l1| {
            let cache = sequential(l1);
            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                black_box(cache.add(value))
            });
        });
    }

    group.bench_function("add_time_ordered", |b| {
        let cache = TimeOrderedCache::<u64>::time_ordered(CacheConfig::default())
            .expect("bench config must be valid");
        let mut value = 0u64;
        b.iter(|| {
            value += 1;
            black_box(cache.add(value))
        });
    });

    // Contended adds: every thread appends the same number of values.
    for &threads in &[2usize, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("add_contended_1000_each", threads),
            &threads,
            |b, &threads| {
                b.iter_with_setup(
                    || Arc::new(sequential(true)),
                    |cache| {
                        let handles: Vec<_> = (0..threads)
                            .map(|_| {
                                let cache = Arc::clone(&cache);
                                thread::spawn(move || {
                                    for i in 0..1_000u64 {
                                        let _ = cache.add(i);
                                    }
                                })
                            })
                            .collect();
                        for handle in handles {
                            let _ = handle.join();
                        }
                        assert_eq!(cache.count(), threads * 1_000);
                    },
                );
            },
        );
    }

    group.bench_function("remove_then_add", |b| {
        let cache = sequential(true);
        for i in 0..10_000u64 {
            let _ = cache.add(i);
        }
        b.iter(|| {
            if let Some(first) = cache.first_id() {
                let _ = black_box(cache.remove(first));
            }
            black_box(cache.add(0))
        });
    });

    group.finish();
}
