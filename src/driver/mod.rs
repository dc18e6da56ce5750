//! Driver Module
//!
//! Defines the contract every cache backend implements, the expiration and
//! configuration types shared by all backends, and the registry that maps
//! driver names to factories.
//!
//! # Drivers
//! - `memory` - in-process map with lazy expiration and a background sweep
//! - `redis` - remote Redis service with native expiry and atomic counters

pub mod memory;
pub mod redis;
mod registry;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;

pub use memory::{MemoryConfig, MemoryDriver, MemoryDriverFactory};
pub use self::redis::{RedisConfig, RedisDriver, RedisDriverFactory};
pub use registry::{DriverFactory, Registry};

// == Expiration ==
/// How long an entry written by `set`, `add` or `replace` stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Use the driver's configured default expiration
    #[default]
    Default,
    /// Never expire
    Never,
    /// Expire this long after the write
    After(Duration),
}

impl Expiration {
    /// Converts the integer seconds convention used at the API boundary.
    ///
    /// `0` selects the driver default, a negative value never expires and a
    /// positive value expires that many seconds from now.
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            0 => Expiration::Default,
            s if s < 0 => Expiration::Never,
            s => Expiration::After(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Resolves to a concrete time-to-live, `None` meaning no expiration.
    ///
    /// A zero `After` duration is treated like `Default`.
    pub fn resolve(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Expiration::Default => default,
            Expiration::After(ttl) if ttl.is_zero() => default,
            Expiration::After(ttl) => Some(ttl),
            Expiration::Never => None,
        }
    }
}

// == Adjustment ==
/// Direction of a numeric adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Increment,
    Decrement,
}

// == Driver Config ==
/// Typed configuration handed to a driver factory.
///
/// Each factory validates the variant it receives.
#[derive(Debug, Clone)]
pub enum DriverConfig {
    Memory(MemoryConfig),
    Redis(RedisConfig),
}

impl DriverConfig {
    /// Short name of the variant, used in error and log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverConfig::Memory(_) => "memory",
            DriverConfig::Redis(_) => "redis",
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig::Memory(MemoryConfig::default())
    }
}

// == Base Driver ==
/// Key operations every backend supports.
///
/// A missing or expired key is reported as `Ok(None)` on read paths, never as
/// an error.
#[async_trait]
pub trait BaseDriver: Send + Sync {
    /// Returns the value stored under `key` if present and unexpired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Returns the value with its expiration instant, `None` meaning the
    /// entry never expires.
    async fn get_with_expiration(
        &self,
        key: &str,
    ) -> Result<Option<(Value, Option<DateTime<Utc>>)>>;

    /// Stores `value`, overwriting any existing entry.
    async fn set(&self, key: &str, value: Value, expiration: Expiration) -> Result<()>;

    /// Stores `value` with the driver's default expiration.
    async fn set_default(&self, key: &str, value: Value) -> Result<()> {
        self.set(key, value, Expiration::Default).await
    }

    /// Stores `value` only if `key` is absent or expired.
    ///
    /// Fails with `KeyExists` without touching the live entry otherwise.
    async fn add(&self, key: &str, value: Value, expiration: Expiration) -> Result<()>;

    /// Stores `value` only if `key` holds a live entry, failing with
    /// `NotFound` otherwise.
    async fn replace(&self, key: &str, value: Value, expiration: Expiration) -> Result<()>;

    /// Removes `key`. Absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Physically removes expired entries and returns how many were dropped.
    async fn delete_expired(&self) -> Result<usize>;

    /// Drops every entry owned by this driver instance.
    async fn flush(&self) -> Result<()>;
}

// == Numeric Operations ==
/// Atomic counter adjustments.
///
/// Each call fails with `NotFound` for a missing key, `NotNumeric` when the
/// stored value is not an integer of the requested width and `Overflow` when
/// the result does not fit that width.
#[async_trait]
pub trait NumericOps: Send + Sync {
    async fn increment_int(&self, key: &str, delta: isize) -> Result<isize>;
    async fn decrement_int(&self, key: &str, delta: isize) -> Result<isize>;

    async fn increment_int64(&self, key: &str, delta: i64) -> Result<i64>;
    async fn decrement_int64(&self, key: &str, delta: i64) -> Result<i64>;

    async fn increment_uint(&self, key: &str, delta: usize) -> Result<usize>;
    async fn decrement_uint(&self, key: &str, delta: usize) -> Result<usize>;

    async fn increment_uint64(&self, key: &str, delta: u64) -> Result<u64>;
    async fn decrement_uint64(&self, key: &str, delta: u64) -> Result<u64>;
}

/// A complete cache backend.
pub trait Driver: BaseDriver + NumericOps {}

impl<T: BaseDriver + NumericOps + ?Sized> Driver for T {}
