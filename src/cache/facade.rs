//! Cache Facade Module
//!
//! Public cache API wrapping one driver: integer-second TTLs, typed helpers
//! and create-on-miss memoization.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::flight::FlightGroup;
use crate::config::Config;
use crate::driver::{BaseDriver, Driver, DriverConfig, Expiration, Registry};
use crate::error::{CacheError, Result};

/// TTL convention for entries that never expire.
pub const FOREVER: i64 = -1;

// == Cache ==
/// Key-value cache over a pluggable driver.
///
/// TTLs are whole seconds: `0` uses the driver default, a negative value
/// never expires and a positive value expires that many seconds from now.
///
/// A `Cache` is safe to share between tasks (`Arc<Cache>`); every call
/// delegates to the driver, which owns all synchronization.
pub struct Cache {
    driver: Arc<dyn Driver>,
    flights: Option<FlightGroup>,
}

impl Cache {
    // == Constructors ==
    /// Builds a cache over the driver registered under `driver_name`.
    ///
    /// Fails for unknown driver names and for driver construction errors such
    /// as an unreachable Redis server.
    pub async fn new(registry: &Registry, driver_name: &str, config: DriverConfig) -> Result<Self> {
        let driver = registry.create(driver_name, config).await?;
        Ok(Self::from_driver(driver))
    }

    /// Builds a cache from environment-style configuration.
    pub async fn from_config(registry: &Registry, config: &Config) -> Result<Self> {
        let cache = Self::new(registry, &config.driver, config.driver_config()).await?;
        Ok(if config.single_flight {
            cache.with_single_flight()
        } else {
            cache
        })
    }

    /// Wraps an already constructed driver.
    pub fn from_driver(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            flights: None,
        }
    }

    /// Enables per-key suppression of concurrent `remember` misses.
    ///
    /// Callers missing on a key wait for the caller already creating it and
    /// then read its stored value instead of running `create` again.
    pub fn with_single_flight(mut self) -> Self {
        self.flights = Some(FlightGroup::new());
        self
    }

    /// The wrapped driver, for `add`, `replace` and counter operations.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    // == Get ==
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.driver.get(key).await
    }

    /// Reads the value under `key` and deserializes it into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.driver.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // == Put ==
    /// Stores `value`, overwriting any existing entry.
    pub async fn put(&self, key: &str, value: impl Into<Value>, ttl_seconds: i64) -> Result<()> {
        self.driver
            .set(key, value.into(), Expiration::from_seconds(ttl_seconds))
            .await
    }

    /// Serializes `value` and stores it.
    pub async fn put_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: i64,
    ) -> Result<()> {
        self.put(key, serde_json::to_value(value)?, ttl_seconds)
            .await
    }

    // == Exists ==
    /// Returns true if `key` holds a live entry.
    ///
    /// This performs a full read through the driver.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.driver.get(key).await?.is_some())
    }

    // == Remember ==
    /// Returns the cached value for `key`, or runs `create`, stores its value
    /// under `ttl_seconds` and returns it.
    ///
    /// A failing `create` is reported as `CacheError::Create` and nothing is
    /// cached, so the next call retries the creation.
    pub async fn remember<F, Fut>(&self, key: &str, ttl_seconds: i64, create: F) -> Result<Value>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<Value>> + Send,
    {
        if let Some(value) = self.driver.get(key).await? {
            return Ok(value);
        }

        let Some(flights) = &self.flights else {
            return self.create_and_store(key, ttl_seconds, create).await;
        };

        let _guard = flights.acquire(key).await;

        // Another caller may have stored the value while we waited.
        if let Some(value) = self.driver.get(key).await? {
            debug!("remember: '{}' filled by a concurrent caller", key);
            return Ok(value);
        }

        self.create_and_store(key, ttl_seconds, create).await
    }

    /// `remember` with an entry that never expires.
    pub async fn remember_forever<F, Fut>(&self, key: &str, create: F) -> Result<Value>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<Value>> + Send,
    {
        self.remember(key, FOREVER, create).await
    }

    async fn create_and_store<F, Fut>(&self, key: &str, ttl_seconds: i64, create: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Value>>,
    {
        debug!("remember: creating value for '{}'", key);
        let value = create().await.map_err(CacheError::Create)?;
        self.put(key, value.clone(), ttl_seconds).await?;
        Ok(value)
    }

    // == Forget ==
    /// Removes `key`. Absent keys are not an error.
    pub async fn forget(&self, key: &str) -> Result<()> {
        self.driver.delete(key).await
    }

    // == Flush ==
    /// Removes every entry of the wrapped driver.
    pub async fn flush(&self) -> Result<()> {
        self.driver.flush().await
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("single_flight", &self.flights.is_some())
            .finish()
    }
}
