//! Integration tests for keyed cache registration and lifetimes.

use ordered_cache_rs::{
    CacheConfig, CacheError, CacheLifetime, CacheRegistry, SequentialIdGenerator,
    TimeOrderedIdGenerator,
};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

fn keyed(key: &str, lifetime: CacheLifetime) -> CacheConfig {
    CacheConfig::new()
        .with_registration_key(key)
        .with_lifetime(lifetime)
}

#[test]
fn keys_resolve_independent_caches() {
    let registry: CacheRegistry<u64, String> = CacheRegistry::new();
    registry
        .register(keyed("orders", CacheLifetime::Singleton), SequentialIdGenerator::new)
        .expect("register orders");
    registry
        .register(keyed("audit", CacheLifetime::Singleton), SequentialIdGenerator::new)
        .expect("register audit");
    assert_eq!(registry.len(), 2);

    let orders = registry.resolve(Some("orders")).expect("orders");
    let audit = registry.resolve(Some("audit")).expect("audit");
    orders.add("o1".to_string()).expect("add");
    orders.add("o2".to_string()).expect("add");
    audit.add("a1".to_string()).expect("add");

    assert_eq!(orders.count(), 2);
    assert_eq!(audit.count(), 1);
    assert!(!registry.contains(None));
    assert!(matches!(
        registry.resolve(None),
        Err(CacheError::InvalidConfiguration { .. })
    ));
}

#[test]
fn duplicate_key_is_rejected() {
    let registry: CacheRegistry<u64, String> = CacheRegistry::new();
    registry
        .register(CacheConfig::default(), SequentialIdGenerator::new)
        .expect("first registration");
    let second = registry.register(
        CacheConfig::default().with_lifetime(CacheLifetime::Transient),
        SequentialIdGenerator::new,
    );
    assert!(matches!(
        second,
        Err(CacheError::InvalidConfiguration { .. })
    ));
    assert_eq!(registry.lifetime(None), Some(CacheLifetime::Singleton));
}

#[test]
fn singleton_is_shared_across_threads() {
    let registry: Arc<CacheRegistry<u64, u32>> = Arc::new(CacheRegistry::new());
    registry
        .register(CacheConfig::default(), SequentialIdGenerator::new)
        .expect("register");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let cache = registry.resolve(None).expect("resolve");
                cache.add(i).expect("add");
                cache
            })
        })
        .collect();
    let caches: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    assert!(caches.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(caches[0].count(), 8);
}

#[test]
fn scoped_instances_live_per_scope() {
    let registry: CacheRegistry<Uuid, String> = CacheRegistry::new();
    registry
        .register(
            keyed("session", CacheLifetime::Scoped),
            TimeOrderedIdGenerator::new,
        )
        .expect("register");

    let first_scope = registry.scope();
    let a = first_scope.resolve(Some("session")).expect("resolve");
    let b = first_scope.resolve(Some("session")).expect("resolve");
    assert!(Arc::ptr_eq(&a, &b));
    a.add("hello".to_string()).expect("add");

    let second_scope = registry.scope();
    let c = second_scope.resolve(Some("session")).expect("resolve");
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(c.count(), 0);

    assert!(registry.resolve(Some("session")).is_err());
}

#[test]
fn transient_resolves_fresh_instances() {
    let registry: CacheRegistry<u64, String> = CacheRegistry::new();
    registry
        .register(
            keyed("scratch", CacheLifetime::Transient),
            SequentialIdGenerator::new,
        )
        .expect("register");

    let a = registry.resolve(Some("scratch")).expect("resolve");
    a.add("x".to_string()).expect("add");
    let b = registry.resolve(Some("scratch")).expect("resolve");
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(b.count(), 0);
    assert_eq!(*b.add("y".to_string()).expect("add").id(), 1);
}
