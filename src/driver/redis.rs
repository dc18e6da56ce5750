//! Redis Driver
//!
//! Networked driver backed by a Redis server. Expiry is native to Redis, so
//! `delete_expired` is a no-op, and counters use server-side atomic commands
//! that hold across every client of the same server.
//!
//! Values are stored as their JSON text. Integer counters therefore look like
//! plain decimal numbers on the server and work with `INCRBY`.
//!
//! ## Example
//!
//! ```ignore
//! use mini_cache::driver::{RedisConfig, RedisDriver};
//!
//! let driver = RedisDriver::connect(RedisConfig {
//!     url: "redis://localhost:6379".to_string(),
//!     key_prefix: Some("app:".to_string()),
//!     ..RedisConfig::default()
//! })
//! .await?;
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script};
use serde_json::Value;
use tracing::{debug, info};

use crate::driver::{
    Adjustment, BaseDriver, Driver, DriverConfig, DriverFactory, Expiration, NumericOps,
};
use crate::error::{CacheError, Result};

/// Largest TTL sent to the server; Redis rejects expire times that overflow
/// when added to its clock.
const MAX_TTL_MILLIS: u64 = (i64::MAX / 2) as u64;

/// Keys deleted per `SCAN` batch when flushing a prefixed namespace.
const FLUSH_SCAN_COUNT: usize = 500;

/// Existence check, adjustment and unsigned guard in one atomic step.
///
/// KEYS[1] = key, ARGV[1] = signed delta, ARGV[2] = "1" for unsigned widths.
/// Replies `{status, value}` where status is `ok`, `missing`, `nan`,
/// `overflow` or `underflow`.
const ADJUST_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then
  return {'missing', ''}
end
if ARGV[2] == '1' and string.sub(current, 1, 1) == '-' then
  return {'nan', ''}
end
local ok, result = pcall(redis.call, 'INCRBY', KEYS[1], ARGV[1])
if not ok then
  local message = type(result) == 'table' and result.err or tostring(result)
  if string.find(message, 'overflow') then
    return {'overflow', ''}
  end
  return {'nan', ''}
end
if ARGV[2] == '1' and result < 0 then
  redis.call('DECRBY', KEYS[1], ARGV[1])
  return {'underflow', ''}
end
return {'ok', redis.call('GET', KEYS[1])}
"#;

// == Redis Config ==
/// Construction parameters for the Redis driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://:password@localhost:6379/0`
    pub url: String,
    /// Prefix namespacing every key of this driver instance
    pub key_prefix: Option<String>,
    /// TTL used for `Expiration::Default`, None = never expire
    pub default_expiration: Option<Duration>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            default_expiration: None,
        }
    }
}

/// Precondition attached to a `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetCondition {
    Always,
    IfAbsent,
    IfPresent,
}

// == Redis Driver ==
/// Redis-backed cache driver.
///
/// Holds one multiplexed connection that is cloned per operation. Calls are
/// single-attempt: I/O failures surface as `CacheError::Backend`.
pub struct RedisDriver {
    conn: MultiplexedConnection,
    key_prefix: Option<String>,
    default_expiration: Option<Duration>,
    adjust_script: Script,
}

impl RedisDriver {
    // == Constructor ==
    /// Connects to the server and verifies it answers `PING`.
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis answered {}", pong);

        info!(
            "Connected to Redis (prefix: {})",
            config.key_prefix.as_deref().unwrap_or("<none>")
        );

        Ok(Self {
            conn,
            key_prefix: config.key_prefix,
            default_expiration: config.default_expiration,
            adjust_script: Script::new(ADJUST_SCRIPT),
        })
    }

    /// Returns the server-side key for `key`.
    fn key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        }
    }

    /// Writes `value` under `key`, returning false when the condition failed.
    async fn write(
        &self,
        key: &str,
        value: &Value,
        expiration: Expiration,
        condition: SetCondition,
    ) -> Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(key)).arg(encode(value)?);

        if let Some(ttl) = expiration.resolve(self.default_expiration) {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        match condition {
            SetCondition::Always => {}
            SetCondition::IfAbsent => {
                cmd.arg("NX");
            }
            SetCondition::IfPresent => {
                cmd.arg("XX");
            }
        }

        let mut conn = self.conn.clone();
        let reply: Option<String> = cmd.query_async(&mut conn).await?;
        Ok(reply.is_some())
    }

    /// Runs the adjustment script and parses the new value as `T`.
    async fn adjust<T>(&self, key: &str, delta: T, direction: Adjustment, unsigned: bool) -> Result<T>
    where
        T: TryInto<i64> + FromStr + Send,
    {
        let delta = signed_delta(key, delta, direction)?;

        let mut conn = self.conn.clone();
        let (status, value): (String, String) = self
            .adjust_script
            .key(self.key(key))
            .arg(delta)
            .arg(if unsigned { "1" } else { "0" })
            .invoke_async(&mut conn)
            .await?;

        let not_numeric = || CacheError::NotNumeric {
            key: key.to_string(),
            expected: std::any::type_name::<T>(),
        };

        match status.as_str() {
            "ok" => value.parse::<T>().map_err(|_| not_numeric()),
            "missing" => Err(CacheError::NotFound(key.to_string())),
            "overflow" | "underflow" => Err(CacheError::Overflow(key.to_string())),
            _ => Err(not_numeric()),
        }
    }

    /// Deletes every key carrying `prefix`, batch by batch.
    async fn flush_prefix(&self, prefix: &str) -> Result<()> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(FLUSH_SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let _: i64 = conn.del(keys).await?;
            }

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl BaseDriver for RedisDriver {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.key(key)).await?;
        Ok(raw.map(decode))
    }

    async fn get_with_expiration(
        &self,
        key: &str,
    ) -> Result<Option<(Value, Option<DateTime<Utc>>)>> {
        let key = self.key(key);
        let mut conn = self.conn.clone();

        let (raw, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .get(&key)
            .pttl(&key)
            .query_async(&mut conn)
            .await?;

        Ok(raw.map(|raw| (decode(raw), expiry_from_pttl(pttl, Utc::now()))))
    }

    async fn set(&self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        self.write(key, &value, expiration, SetCondition::Always)
            .await?;
        Ok(())
    }

    async fn add(&self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        if self
            .write(key, &value, expiration, SetCondition::IfAbsent)
            .await?
        {
            Ok(())
        } else {
            Err(CacheError::KeyExists(key.to_string()))
        }
    }

    async fn replace(&self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        if self
            .write(key, &value, expiration, SetCondition::IfPresent)
            .await?
        {
            Ok(())
        } else {
            Err(CacheError::NotFound(key.to_string()))
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(self.key(key)).await?;
        Ok(())
    }

    async fn delete_expired(&self) -> Result<usize> {
        // Redis expires keys natively.
        Ok(0)
    }

    async fn flush(&self) -> Result<()> {
        match &self.key_prefix {
            Some(prefix) => self.flush_prefix(prefix).await,
            None => {
                let mut conn = self.conn.clone();
                let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl NumericOps for RedisDriver {
    async fn increment_int(&self, key: &str, delta: isize) -> Result<isize> {
        self.adjust(key, delta, Adjustment::Increment, false).await
    }

    async fn decrement_int(&self, key: &str, delta: isize) -> Result<isize> {
        self.adjust(key, delta, Adjustment::Decrement, false).await
    }

    async fn increment_int64(&self, key: &str, delta: i64) -> Result<i64> {
        self.adjust(key, delta, Adjustment::Increment, false).await
    }

    async fn decrement_int64(&self, key: &str, delta: i64) -> Result<i64> {
        self.adjust(key, delta, Adjustment::Decrement, false).await
    }

    async fn increment_uint(&self, key: &str, delta: usize) -> Result<usize> {
        self.adjust(key, delta, Adjustment::Increment, true).await
    }

    async fn decrement_uint(&self, key: &str, delta: usize) -> Result<usize> {
        self.adjust(key, delta, Adjustment::Decrement, true).await
    }

    async fn increment_uint64(&self, key: &str, delta: u64) -> Result<u64> {
        self.adjust(key, delta, Adjustment::Increment, true).await
    }

    async fn decrement_uint64(&self, key: &str, delta: u64) -> Result<u64> {
        self.adjust(key, delta, Adjustment::Decrement, true).await
    }
}

impl std::fmt::Debug for RedisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDriver")
            .field("key_prefix", &self.key_prefix)
            .field("default_expiration", &self.default_expiration)
            .finish()
    }
}

// == Factory ==
/// Factory registered under `redis`.
///
/// Rejects non-Redis configurations and fails when the server is unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisDriverFactory;

#[async_trait]
impl DriverFactory for RedisDriverFactory {
    async fn create(&self, config: DriverConfig) -> Result<Arc<dyn Driver>> {
        match config {
            DriverConfig::Redis(config) => Ok(Arc::new(RedisDriver::connect(config).await?)),
            other => Err(CacheError::InvalidConfig(format!(
                "redis driver requires a redis config, got {}",
                other.kind()
            ))),
        }
    }
}

// == Helpers ==
fn encode(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes stored text; anything that is not JSON is returned as a string.
fn decode(raw: String) -> Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis())
        .unwrap_or(u64::MAX)
        .clamp(1, MAX_TTL_MILLIS)
}

/// Maps a `PTTL` reply to an expiration instant. Negative replies mean the
/// key has no expiry.
fn expiry_from_pttl(pttl: i64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if pttl < 0 {
        return None;
    }
    now.checked_add_signed(chrono::Duration::milliseconds(pttl))
}

fn signed_delta<T: TryInto<i64>>(key: &str, delta: T, direction: Adjustment) -> Result<i64> {
    let delta: i64 = delta
        .try_into()
        .map_err(|_| CacheError::Overflow(key.to_string()))?;

    match direction {
        Adjustment::Increment => Ok(delta),
        Adjustment::Decrement => delta
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string())),
    }
}

/// Escapes glob metacharacters so a prefix matches literally in `SCAN`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
