//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for drivers, the registry and the cache facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// No factory is registered under the requested driver name
    #[error("Unknown cache driver: {0}")]
    UnknownDriver(String),

    /// A factory is already registered under this driver name
    #[error("Duplicate cache driver registration: {0}")]
    DuplicateDriver(String),

    /// Driver configuration does not fit the selected driver
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// `add` found a live entry under the key
    #[error("Key already exists: {0}")]
    KeyExists(String),

    /// The key is absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The stored value cannot be read as the requested numeric type
    #[error("Value of key {key} is not a valid {expected}")]
    NotNumeric { key: String, expected: &'static str },

    /// The numeric adjustment does not fit the requested type
    #[error("Numeric overflow adjusting key: {0}")]
    Overflow(String),

    /// I/O or protocol failure reported by the networked backend
    #[error("Backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The creation callback passed to `remember` failed
    #[error("Create function failed: {0}")]
    Create(#[source] anyhow::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CacheError::KeyExists("a".to_string()).to_string(),
            "Key already exists: a"
        );
        assert_eq!(
            CacheError::NotNumeric {
                key: "hits".to_string(),
                expected: "u64",
            }
            .to_string(),
            "Value of key hits is not a valid u64"
        );
    }

    #[test]
    fn test_create_error_keeps_source() {
        let err = CacheError::Create(anyhow::anyhow!("upstream down"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("upstream down"));
    }
}
