//! Memory Store Module
//!
//! Unlocked storage engine behind the memory driver: a HashMap of entries with
//! lazy expiration. Callers serialize access through the driver's lock.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::counter::Counter;
use super::entry::MemoryEntry;
use crate::driver::{Adjustment, Expiration};
use crate::error::{CacheError, Result};

// == Memory Store ==
/// Key-value storage with per-entry expiration.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, MemoryEntry>,
    /// TTL applied for `Expiration::Default`, None = never expire
    default_expiration: Option<Duration>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store with the given default expiration.
    pub fn new(default_expiration: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            default_expiration,
        }
    }

    // == Get ==
    /// Returns the live entry under `key`.
    ///
    /// Expired entries are treated as absent even before the sweep removes
    /// them.
    pub fn get(&self, key: &str) -> Option<&MemoryEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Set ==
    /// Stores a value, overwriting any existing entry and resetting its TTL.
    pub fn set(&mut self, key: &str, value: Value, expiration: Expiration) {
        let ttl = expiration.resolve(self.default_expiration);
        self.entries
            .insert(key.to_string(), MemoryEntry::new(value, ttl));
    }

    // == Add ==
    /// Stores a value only if no live entry exists under `key`.
    pub fn add(&mut self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        if self.get(key).is_some() {
            return Err(CacheError::KeyExists(key.to_string()));
        }
        self.set(key, value, expiration);
        Ok(())
    }

    // == Replace ==
    /// Stores a value only if a live entry exists under `key`.
    pub fn replace(&mut self, key: &str, value: Value, expiration: Expiration) -> Result<()> {
        if self.get(key).is_none() {
            return Err(CacheError::NotFound(key.to_string()));
        }
        self.set(key, value, expiration);
        Ok(())
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if something was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Adjust ==
    /// Adds or subtracts `delta` from the integer stored under `key`.
    ///
    /// The entry keeps its expiration instant. On any error the stored value
    /// is left untouched.
    pub fn adjust<T: Counter>(&mut self, key: &str, delta: T, direction: Adjustment) -> Result<T> {
        let now = Utc::now();
        let entry = self
            .entries
            .get_mut(key)
            .filter(|entry| !entry.is_expired_at(now))
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let current = T::from_value(&entry.value).ok_or_else(|| CacheError::NotNumeric {
            key: key.to_string(),
            expected: T::NAME,
        })?;

        let updated = match direction {
            Adjustment::Increment => current.checked_add(delta),
            Adjustment::Decrement => current.checked_sub(delta),
        }
        .ok_or_else(|| CacheError::Overflow(key.to_string()))?;

        entry.value = updated.into_value();
        Ok(updated)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    fn cleanup_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    // == Flush ==
    /// Drops every entry.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones not yet
    /// swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    const SHORT: Expiration = Expiration::After(Duration::from_millis(50));

    fn store() -> MemoryStore {
        MemoryStore::new(Some(Duration::from_secs(300)))
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store();

        store.set("key1", json!("value1"), Expiration::Default);
        let entry = store.get("key1").unwrap();

        assert_eq!(entry.value, json!("value1"));
        assert!(entry.expires_at.is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_never_expiring_entry() {
        let mut store = store();

        store.set("key1", json!(1), Expiration::Never);
        assert!(store.get("key1").unwrap().expires_at.is_none());
    }

    #[test]
    fn test_store_default_without_default_expiration() {
        let mut store = MemoryStore::new(None);

        store.set("key1", json!(1), Expiration::Default);
        assert!(store.get("key1").unwrap().expires_at.is_none());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store();

        store.set("key1", json!("value1"), Expiration::Default);
        store.set("key1", json!("value2"), Expiration::Default);

        assert_eq!(store.get("key1").unwrap().value, json!("value2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lazy_expiration() {
        let mut store = store();

        store.set("key1", json!("value1"), SHORT);
        assert!(store.get("key1").is_some());

        sleep(Duration::from_millis(80));

        // Not yet swept but no longer readable
        assert!(store.get("key1").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_add() {
        let mut store = store();

        store.add("key1", json!("first"), Expiration::Never).unwrap();
        let result = store.add("key1", json!("second"), Expiration::Never);

        assert!(matches!(result, Err(CacheError::KeyExists(_))));
        assert_eq!(store.get("key1").unwrap().value, json!("first"));
    }

    #[test]
    fn test_store_add_over_expired_entry() {
        let mut store = store();

        store.set("key1", json!("stale"), SHORT);
        sleep(Duration::from_millis(80));

        store.add("key1", json!("fresh"), Expiration::Never).unwrap();
        assert_eq!(store.get("key1").unwrap().value, json!("fresh"));
    }

    #[test]
    fn test_store_replace() {
        let mut store = store();

        let result = store.replace("key1", json!("value"), Expiration::Default);
        assert!(matches!(result, Err(CacheError::NotFound(_))));
        assert!(store.is_empty());

        store.set("key1", json!("old"), Expiration::Default);
        store.replace("key1", json!("new"), Expiration::Default).unwrap();
        assert_eq!(store.get("key1").unwrap().value, json!("new"));
    }

    #[test]
    fn test_store_replace_expired_entry() {
        let mut store = store();

        store.set("key1", json!("old"), SHORT);
        sleep(Duration::from_millis(80));

        let result = store.replace("key1", json!("new"), Expiration::Default);
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_store_delete() {
        let mut store = store();

        store.set("key1", json!("value1"), Expiration::Default);
        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_adjust() {
        let mut store = store();
        store.set("counter", json!(10), Expiration::Default);

        assert_eq!(store.adjust("counter", 5i64, Adjustment::Increment).unwrap(), 15);
        assert_eq!(store.adjust("counter", 3i64, Adjustment::Decrement).unwrap(), 12);
        assert_eq!(store.get("counter").unwrap().value, json!(12));
    }

    #[test]
    fn test_store_adjust_keeps_expiration() {
        let mut store = store();
        store.set("counter", json!(1), Expiration::After(Duration::from_secs(60)));
        let before = store.get("counter").unwrap().expires_at;

        store.adjust("counter", 1u64, Adjustment::Increment).unwrap();
        assert_eq!(store.get("counter").unwrap().expires_at, before);
    }

    #[test]
    fn test_store_adjust_missing_key() {
        let mut store = store();

        let result = store.adjust("missing", 1i64, Adjustment::Increment);
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_store_adjust_not_numeric() {
        let mut store = store();
        store.set("name", json!("bob"), Expiration::Default);

        let result = store.adjust("name", 1i64, Adjustment::Increment);
        assert!(matches!(
            result,
            Err(CacheError::NotNumeric { expected: "i64", .. })
        ));
        assert_eq!(store.get("name").unwrap().value, json!("bob"));
    }

    #[test]
    fn test_store_adjust_unsigned_underflow() {
        let mut store = store();
        store.set("counter", json!(2), Expiration::Default);

        let result = store.adjust("counter", 3u64, Adjustment::Decrement);
        assert!(matches!(result, Err(CacheError::Overflow(_))));
        assert_eq!(store.get("counter").unwrap().value, json!(2));
    }

    #[test]
    fn test_store_adjust_negative_value_as_unsigned() {
        let mut store = store();
        store.set("counter", json!(-1), Expiration::Default);

        let result = store.adjust("counter", 1usize, Adjustment::Increment);
        assert!(matches!(result, Err(CacheError::NotNumeric { .. })));
    }

    #[test]
    fn test_store_cleanup_expired() {
        let mut store = store();

        store.set("key1", json!("value1"), SHORT);
        store.set("key2", json!("value2"), Expiration::After(Duration::from_secs(10)));
        store.set("key3", json!("value3"), Expiration::Never);

        sleep(Duration::from_millis(80));

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 2);
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
    }

    #[test]
    fn test_store_flush() {
        let mut store = store();

        store.set("key1", json!(1), Expiration::Default);
        store.set("key2", json!(2), Expiration::Never);
        store.flush();

        assert!(store.is_empty());
        assert!(store.get("key1").is_none());
    }
}
