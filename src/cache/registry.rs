/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Keyed cache registrations with lifetime management.
//!
//! A host process registers one [`CacheConfig`] plus a generator factory per
//! registration key, then resolves caches by key. The configured
//! [`CacheLifetime`] decides whether a resolve shares an instance:
//!
//! | Lifetime    | Instance returned by `resolve`                 |
//! |-------------|------------------------------------------------|
//! | `Singleton` | the same instance for every caller             |
//! | `Transient` | a new instance every time                      |
//! | `Scoped`    | one instance per [`CacheScope`]                |
//!
//! Configuration problems surface at [`CacheRegistry::register`], not at the
//! first resolve.

use crate::cache::config::{CacheConfig, CacheLifetime};
use crate::cache::error::CacheError;
use crate::cache::id::{CacheId, IdGenerator};
use crate::cache::ordered::OrderedCache;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

type Factory<Id, V> = Box<dyn Fn(&CacheConfig) -> Result<OrderedCache<Id, V>, CacheError> + Send + Sync>;

struct Registration<Id, V> {
    config: CacheConfig,
    build: Factory<Id, V>,
    shared: OnceLock<Arc<OrderedCache<Id, V>>>,
}

impl<Id, V> Registration<Id, V> {
    fn build(&self) -> Result<Arc<OrderedCache<Id, V>>, CacheError> {
        (self.build)(&self.config).map(Arc::new)
    }
}

/// Registered cache configurations, keyed by registration key.
///
/// The default registration (no key) is stored under the empty string.
pub struct CacheRegistry<Id, V> {
    registrations: DashMap<String, Arc<Registration<Id, V>>>,
}

impl<Id, V> CacheRegistry<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: DashMap::new(),
        }
    }

    /// Registers `config`; every instance built for it gets a generator from
    /// `generator`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] when `config` does not
    /// validate or its key is already registered.
    pub fn register<G, F>(&self, config: CacheConfig, generator: F) -> Result<(), CacheError>
    where
        G: IdGenerator<Id>,
        F: Fn() -> G + Send + Sync + 'static,
    {
        config.validate()?;
        let key = config.registration_key.clone().unwrap_or_default();
        match self.registrations.entry(key) {
            MapEntry::Occupied(occupied) => Err(CacheError::InvalidConfiguration {
                message: format!("a cache is already registered under key {:?}", occupied.key()),
            }),
            MapEntry::Vacant(vacant) => {
                info!(
                    key = %vacant.key(),
                    lifetime = %config.lifetime,
                    l1 = config.include_l1_caching,
                    "cache registered"
                );
                vacant.insert(Arc::new(Registration {
                    config,
                    build: Box::new(move |config: &CacheConfig| {
                        OrderedCache::new(config.clone(), generator())
                    }),
                    shared: OnceLock::new(),
                }));
                Ok(())
            }
        }
    }

    /// Resolves the cache registered under `key` (`None` for the default
    /// registration).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] when nothing is registered
    /// under `key`, or when the registration is scoped (use
    /// [`CacheScope::resolve`] instead).
    pub fn resolve(&self, key: Option<&str>) -> Result<Arc<OrderedCache<Id, V>>, CacheError> {
        let registration = self.registration(key)?;
        match registration.config.lifetime {
            CacheLifetime::Singleton => Self::shared(&registration),
            CacheLifetime::Transient => registration.build(),
            CacheLifetime::Scoped => Err(CacheError::InvalidConfiguration {
                message: format!(
                    "cache {:?} is scoped and must be resolved within a scope",
                    key.unwrap_or_default()
                ),
            }),
        }
    }

    /// Opens a resolution scope.
    #[must_use]
    pub fn scope(&self) -> CacheScope<'_, Id, V> {
        CacheScope {
            registry: self,
            instances: DashMap::new(),
        }
    }

    /// The lifetime configured under `key`.
    #[must_use]
    pub fn lifetime(&self, key: Option<&str>) -> Option<CacheLifetime> {
        self.registrations
            .get(key.unwrap_or_default())
            .map(|r| r.config.lifetime)
    }

    /// Whether anything is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: Option<&str>) -> bool {
        self.registrations.contains_key(key.unwrap_or_default())
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn registration(&self, key: Option<&str>) -> Result<Arc<Registration<Id, V>>, CacheError> {
        let key = key.unwrap_or_default();
        self.registrations
            .get(key)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CacheError::InvalidConfiguration {
                message: format!("no cache registered under key {key:?}"),
            })
    }

    fn shared(registration: &Registration<Id, V>) -> Result<Arc<OrderedCache<Id, V>>, CacheError> {
        if let Some(cache) = registration.shared.get() {
            return Ok(Arc::clone(cache));
        }
        let built = registration.build()?;
        Ok(Arc::clone(registration.shared.get_or_init(|| built)))
    }
}

impl<Id, V> Default for CacheRegistry<Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A resolution scope: scoped registrations resolve to one instance per
/// scope, dropped with it.
pub struct CacheScope<'a, Id, V> {
    registry: &'a CacheRegistry<Id, V>,
    instances: DashMap<String, Arc<OrderedCache<Id, V>>>,
}

impl<Id, V> CacheScope<'_, Id, V>
where
    Id: CacheId,
    V: Clone + Send + Sync + 'static,
{
    /// Resolves `key` within this scope. Singleton and transient
    /// registrations behave as in [`CacheRegistry::resolve`].
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] when nothing is registered
    /// under `key`.
    pub fn resolve(&self, key: Option<&str>) -> Result<Arc<OrderedCache<Id, V>>, CacheError> {
        let registration = self.registry.registration(key)?;
        if registration.config.lifetime != CacheLifetime::Scoped {
            return self.registry.resolve(key);
        }
        let key = key.unwrap_or_default();
        if let Some(cache) = self.instances.get(key) {
            return Ok(Arc::clone(cache.value()));
        }
        let built = registration.build()?;
        debug!(key, "scoped cache created");
        Ok(Arc::clone(
            self.instances.entry(key.to_string()).or_insert(built).value(),
        ))
    }
}
