//! Memory Driver
//!
//! In-process driver backed by a HashMap behind a single `RwLock`. Expired
//! entries are hidden on read and physically removed by a background sweep.

mod counter;
mod entry;
mod store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::driver::{
    Adjustment, BaseDriver, Driver, DriverConfig, DriverFactory, Expiration, NumericOps,
};
use crate::error::Result;
use crate::tasks::spawn_sweep_task;

pub use counter::Counter;
pub use entry::MemoryEntry;
pub use store::MemoryStore;

// == Memory Config ==
/// Construction parameters for the memory driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// TTL used for `Expiration::Default`, None = never expire
    pub default_expiration: Option<Duration>,
    /// Interval between background sweeps, zero disables the sweep
    pub sweep_interval: Duration,
}

impl MemoryConfig {
    /// Default configuration with the background sweep disabled.
    pub fn without_sweep() -> Self {
        Self {
            sweep_interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            default_expiration: Some(Duration::from_secs(5 * 60)),
            sweep_interval: Duration::from_secs(10 * 60),
        }
    }
}

// == Memory Driver ==
/// In-process cache driver.
///
/// All operations on a key are linearized by one lock; numeric adjustments
/// read, modify and write under the write guard.
#[derive(Debug)]
pub struct MemoryDriver {
    store: Arc<RwLock<MemoryStore>>,
    sweep: Option<JoinHandle<()>>,
}

impl MemoryDriver {
    // == Constructor ==
    /// Creates a new memory driver.
    ///
    /// The background sweep starts only when `sweep_interval` is non-zero and
    /// a Tokio runtime is available; it stops when the driver is dropped.
    pub fn new(config: MemoryConfig) -> Self {
        let store = Arc::new(RwLock::new(MemoryStore::new(config.default_expiration)));

        let sweep = if config.sweep_interval.is_zero() {
            None
        } else if tokio::runtime::Handle::try_current().is_ok() {
            Some(spawn_sweep_task(store.clone(), config.sweep_interval))
        } else {
            warn!("No Tokio runtime available, memory driver sweep disabled");
            None
        };

        Self { store, sweep }
    }

    /// Returns the number of stored entries, including expired entries not
    /// yet swept.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    async fn adjust<T: Counter + Send>(
        &self,
        key: &str,
        delta: T,
        direction: Adjustment,
    ) -> Result<T> {
        self.store.write().await.adjust(key, delta, direction)
    }
}

impl Drop for MemoryDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.sweep.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl BaseDriver for MemoryDriver {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let store = self.store.read().await;
        Ok(store.get(key).map(|entry| entry.value.clone()))
    }

    async fn get_with_expiration(
        &self,
        key: &str,
    ) -> Result<Option<(Value, Option<DateTime<Utc>>)>> {
        let store = self.store.read().await;
        Ok(store
            .get(key)
            .map(|entry| (entry.value.clone(), entry.expires_at)))
    }

    async fn set(&self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        self.store.write().await.set(key, value, expiration);
        Ok(())
    }

    async fn add(&self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        self.store.write().await.add(key, value, expiration)
    }

    async fn replace(&self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        self.store.write().await.replace(key, value, expiration)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store.write().await.delete(key);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<usize> {
        Ok(self.store.write().await.cleanup_expired())
    }

    async fn flush(&self) -> Result<()> {
        self.store.write().await.flush();
        Ok(())
    }
}

#[async_trait]
impl NumericOps for MemoryDriver {
    async fn increment_int(&self, key: &str, delta: isize) -> Result<isize> {
        self.adjust(key, delta, Adjustment::Increment).await
    }

    async fn decrement_int(&self, key: &str, delta: isize) -> Result<isize> {
        self.adjust(key, delta, Adjustment::Decrement).await
    }

    async fn increment_int64(&self, key: &str, delta: i64) -> Result<i64> {
        self.adjust(key, delta, Adjustment::Increment).await
    }

    async fn decrement_int64(&self, key: &str, delta: i64) -> Result<i64> {
        self.adjust(key, delta, Adjustment::Decrement).await
    }

    async fn increment_uint(&self, key: &str, delta: usize) -> Result<usize> {
        self.adjust(key, delta, Adjustment::Increment).await
    }

    async fn decrement_uint(&self, key: &str, delta: usize) -> Result<usize> {
        self.adjust(key, delta, Adjustment::Decrement).await
    }

    async fn increment_uint64(&self, key: &str, delta: u64) -> Result<u64> {
        self.adjust(key, delta, Adjustment::Increment).await
    }

    async fn decrement_uint64(&self, key: &str, delta: u64) -> Result<u64> {
        self.adjust(key, delta, Adjustment::Decrement).await
    }
}

// == Factory ==
/// Factory registered under `memory`.
///
/// A non-memory configuration falls back to `MemoryConfig::default()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryDriverFactory;

#[async_trait]
impl DriverFactory for MemoryDriverFactory {
    async fn create(&self, config: DriverConfig) -> Result<Arc<dyn Driver>> {
        let config = match config {
            DriverConfig::Memory(config) => config,
            other => {
                warn!(
                    "Memory driver received a {} config, using defaults",
                    other.kind()
                );
                MemoryConfig::default()
            }
        };

        Ok(Arc::new(MemoryDriver::new(config)))
    }
}
