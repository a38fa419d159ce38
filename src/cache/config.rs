//! Cache construction settings.
//!
//! [`CacheConfig`] only influences how an [`OrderedCache`](crate::OrderedCache)
//! is built and registered; it carries no runtime behaviour of its own.
//! It can be built in code with the `with_*` methods or parsed from JSON:
//!
//! ```rust
//! use ordered_cache_rs::{CacheConfig, CacheLifetime};
//!
//! let config = CacheConfig::from_json(
//!     r#"{ "include_l1_caching": true, "l1_max_cap": 1024, "lifetime": "Transient" }"#,
//! )
//! .unwrap();
//! assert!(config.include_l1_caching);
//! assert_eq!(config.l1_min_cap, 128);
//! assert_eq!(config.lifetime, CacheLifetime::Transient);
//! ```

use crate::cache::error::CacheError;
use crate::cache::store::Capacity;
use serde::{Deserialize, Serialize};

/// Default number of entries the bounded tier keeps after eviction.
pub const DEFAULT_L1_MIN_CAP: usize = 128;

/// Default number of entries the bounded tier holds before eviction.
pub const DEFAULT_L1_MAX_CAP: usize = 8192;

/// How a registered cache instance is shared by its resolvers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheLifetime {
    /// One instance shared by every resolver.
    #[default]
    Singleton,
    /// One instance per [`CacheScope`](crate::CacheScope).
    Scoped,
    /// A fresh instance on every resolve.
    Transient,
}

impl std::fmt::Display for CacheLifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheLifetime::Singleton => write!(f, "singleton"),
            CacheLifetime::Scoped => write!(f, "scoped"),
            CacheLifetime::Transient => write!(f, "transient"),
        }
    }
}

/// Settings for one ordered cache instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the bounded fast tier sits in front of the authoritative tier.
    pub include_l1_caching: bool,
    /// Entries kept in the bounded tier after an eviction pass.
    pub l1_min_cap: usize,
    /// Entries held in the bounded tier before eviction starts.
    pub l1_max_cap: usize,
    /// Sharing policy applied by [`CacheRegistry`](crate::CacheRegistry).
    pub lifetime: CacheLifetime,
    /// Key distinguishing several registered caches; `None` is the default slot.
    pub registration_key: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            include_l1_caching: false,
            l1_min_cap: DEFAULT_L1_MIN_CAP,
            l1_max_cap: DEFAULT_L1_MAX_CAP,
            lifetime: CacheLifetime::Singleton,
            registration_key: None,
        }
    }
}

impl CacheConfig {
    /// Default settings: no bounded tier, singleton lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the bounded tier.
    #[must_use]
    #[inline]
    pub fn with_l1_caching(mut self, enabled: bool) -> Self {
        self.include_l1_caching = enabled;
        self
    }

    /// Sets the bounded tier eviction bounds.
    #[must_use]
    #[inline]
    pub fn with_l1_capacity(mut self, min: usize, max: usize) -> Self {
        self.l1_min_cap = min;
        self.l1_max_cap = max;
        self
    }

    /// Sets the registration lifetime.
    #[must_use]
    #[inline]
    pub fn with_lifetime(mut self, lifetime: CacheLifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets the registration key.
    #[must_use]
    #[inline]
    pub fn with_registration_key(mut self, key: impl Into<String>) -> Self {
        self.registration_key = Some(key.into());
        self
    }

    /// Parses and validates a JSON configuration. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] for malformed JSON, an
    /// unknown lifetime, or settings rejected by [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CacheError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings.
    ///
    /// Capacity bounds are checked even when the bounded tier is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] when the capacity bounds
    /// are inconsistent or the registration key is empty.
    pub fn validate(&self) -> Result<(), CacheError> {
        self.l1_capacity()?;
        if self
            .registration_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            return Err(CacheError::InvalidConfiguration {
                message: "registration key must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// The bounded tier eviction bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfiguration`] for inconsistent bounds.
    pub fn l1_capacity(&self) -> Result<Capacity, CacheError> {
        Capacity::new(self.l1_min_cap, self.l1_max_cap)
    }
}
