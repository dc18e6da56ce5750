//! Configuration Module
//!
//! Handles loading cache configuration from environment variables and
//! turning it into a typed driver configuration.

use std::env;
use std::time::Duration;

use crate::driver::{DriverConfig, MemoryConfig, RedisConfig};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registered driver name to construct
    pub driver: String,
    /// Default TTL in seconds, 0 = entries never expire by default
    pub default_ttl: u64,
    /// Memory driver sweep interval in seconds, 0 disables the sweep
    pub sweep_interval: u64,
    /// Suppress concurrent `remember` misses on the same key
    pub single_flight: bool,
    /// Redis connection URL
    pub redis_url: String,
    /// Prefix applied to every Redis key
    pub redis_key_prefix: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DRIVER` - Driver name (default: memory)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 600)
    /// - `CACHE_SINGLE_FLIGHT` - `true` to suppress duplicate creates (default: false)
    /// - `REDIS_URL` - Redis connection URL (default: redis://127.0.0.1:6379)
    /// - `REDIS_KEY_PREFIX` - Redis key prefix (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            driver: env::var("CACHE_DRIVER").unwrap_or(defaults.driver),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
            single_flight: env::var("CACHE_SINGLE_FLIGHT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.single_flight),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            redis_key_prefix: env::var("REDIS_KEY_PREFIX")
                .ok()
                .filter(|prefix| !prefix.is_empty()),
        }
    }

    /// Builds the typed configuration for the selected driver.
    ///
    /// Unknown driver names get a memory configuration; the registry reports
    /// the unknown name when the cache is constructed.
    pub fn driver_config(&self) -> DriverConfig {
        let default_expiration = (self.default_ttl > 0).then(|| Duration::from_secs(self.default_ttl));

        match self.driver.as_str() {
            "redis" => DriverConfig::Redis(RedisConfig {
                url: self.redis_url.clone(),
                key_prefix: self.redis_key_prefix.clone(),
                default_expiration,
            }),
            _ => DriverConfig::Memory(MemoryConfig {
                default_expiration,
                sweep_interval: Duration::from_secs(self.sweep_interval),
            }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver: "memory".to_string(),
            default_ttl: 300,
            sweep_interval: 600,
            single_flight: false,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_key_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.driver, "memory");
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.sweep_interval, 600);
        assert!(!config.single_flight);
        assert!(config.redis_key_prefix.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_DRIVER");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_SWEEP_INTERVAL");
        env::remove_var("CACHE_SINGLE_FLIGHT");
        env::remove_var("REDIS_KEY_PREFIX");

        let config = Config::from_env();
        assert_eq!(config.driver, "memory");
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.sweep_interval, 600);
        assert!(!config.single_flight);
        assert!(config.redis_key_prefix.is_none());
    }

    #[test]
    fn test_memory_driver_config() {
        let config = Config::default();

        match config.driver_config() {
            DriverConfig::Memory(memory) => {
                assert_eq!(memory.default_expiration, Some(Duration::from_secs(300)));
                assert_eq!(memory.sweep_interval, Duration::from_secs(600));
            }
            other => panic!("expected memory config, got {}", other.kind()),
        }
    }

    #[test]
    fn test_redis_driver_config() {
        let config = Config {
            driver: "redis".to_string(),
            default_ttl: 0,
            redis_key_prefix: Some("app:".to_string()),
            ..Config::default()
        };

        match config.driver_config() {
            DriverConfig::Redis(redis) => {
                assert_eq!(redis.url, "redis://127.0.0.1:6379");
                assert_eq!(redis.key_prefix.as_deref(), Some("app:"));
                assert!(redis.default_expiration.is_none());
            }
            other => panic!("expected redis config, got {}", other.kind()),
        }
    }
}
