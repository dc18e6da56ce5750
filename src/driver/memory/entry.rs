//! Memory Entry Module
//!
//! Defines the structure for individual memory driver entries with expiry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

// == Memory Entry ==
/// A stored value and the instant it stops being readable.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    /// The stored value
    pub value: Value,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now, or never for `None`.
    pub fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(expiry_from_now),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its expiration instant, so a
    /// fully elapsed TTL is never readable.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Converts a TTL to an absolute instant, saturating at the far future.
fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = MemoryEntry::new(json!("test_value"), None);

        assert_eq!(entry.value, json!("test_value"));
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_creation_with_ttl() {
        let entry = MemoryEntry::new(json!(42), Some(Duration::from_secs(60)));

        assert!(entry.expires_at.is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = MemoryEntry::new(json!("test_value"), Some(Duration::from_millis(50)));

        assert!(!entry.is_expired());

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Utc::now();
        let entry = MemoryEntry {
            value: json!("test"),
            expires_at: Some(now),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = MemoryEntry::new(json!(1), Some(Duration::MAX));

        assert_eq!(entry.expires_at, Some(DateTime::<Utc>::MAX_UTC));
        assert!(!entry.is_expired());
    }
}
