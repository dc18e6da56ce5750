//! Mini Cache - A pluggable key-value cache layer
//!
//! Provides a uniform cache API over interchangeable drivers: an in-process
//! memory store with lazy expiration and a background sweep, and a Redis
//! store with native expiry. Drivers are selected by name through a
//! [`Registry`].
//!
//! ```ignore
//! use mini_cache::{Cache, DriverConfig, Registry};
//!
//! let registry = Registry::with_builtin_drivers();
//! let cache = Cache::new(&registry, "memory", DriverConfig::default()).await?;
//!
//! cache.put("greeting", "hello", 60).await?;
//! let user = cache
//!     .remember("user:1", 300, || async { Ok(load_user(1).await?) })
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod tasks;

pub use cache::Cache;
pub use config::Config;
pub use driver::{Driver, DriverConfig, Expiration, Registry};
pub use error::{CacheError, Result};
