//! Driver Registry
//!
//! Maps driver names to factories so callers can pick a backend by name.
//!
//! The registry is an explicit object rather than process-wide state: build
//! one at startup, register every driver, then hand it by reference to the
//! code that constructs caches.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::driver::{Driver, DriverConfig, MemoryDriverFactory, RedisDriverFactory};
use crate::error::{CacheError, Result};

// == Driver Factory ==
/// Builds driver instances from a typed configuration.
///
/// Factories validate their own configuration and may fail, for example when
/// a networked backend is unreachable.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self, config: DriverConfig) -> Result<Arc<dyn Driver>>;
}

// == Registry ==
/// Table of driver factories keyed by name.
#[derive(Default)]
pub struct Registry {
    factories: RwLock<HashMap<String, Arc<dyn DriverFactory>>>,
}

impl Registry {
    // == Constructor ==
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the `memory` and `redis` drivers registered.
    pub fn with_builtin_drivers() -> Self {
        let registry = Self::new();
        registry.register("memory", MemoryDriverFactory);
        registry.register("redis", RedisDriverFactory);
        registry
    }

    // == Register ==
    /// Registers `factory` under `name`.
    ///
    /// # Panics
    /// Panics if `name` is already registered. Registration happens once at
    /// startup, so a duplicate is a configuration bug the process must not
    /// run with.
    pub fn register(&self, name: &str, factory: impl DriverFactory + 'static) {
        if let Err(err) = self.try_register(name, factory) {
            panic!("cache driver registration failed: {err}");
        }
    }

    /// Registers `factory` under `name`, returning `DuplicateDriver` instead of
    /// panicking when the name is taken.
    pub fn try_register(&self, name: &str, factory: impl DriverFactory + 'static) -> Result<()> {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if factories.contains_key(name) {
            return Err(CacheError::DuplicateDriver(name.to_string()));
        }

        factories.insert(name.to_string(), Arc::new(factory));
        debug!("Registered cache driver '{}'", name);
        Ok(())
    }

    // == Create ==
    /// Builds a driver instance from the factory registered under `name`.
    pub async fn create(&self, name: &str, config: DriverConfig) -> Result<Arc<dyn Driver>> {
        // Clone the factory out so the lock is not held across the await.
        let factory = {
            let factories = self
                .factories
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            factories.get(name).cloned()
        };

        let factory = factory.ok_or_else(|| CacheError::UnknownDriver(name.to_string()))?;
        let driver = factory.create(config).await?;
        info!("Cache driver '{}' initialized", name);
        Ok(driver)
    }

    // == Names ==
    /// Returns the registered driver names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let factories = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns true if a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("drivers", &self.names())
            .finish()
    }
}
