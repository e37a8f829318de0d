//! Cache error taxonomy
//!
//! Store-availability failures and payload failures are kept apart so callers
//! can tell "the store is down" from "the cached bytes are corrupt".

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the cache client and cache service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Update of a key that does not exist
    #[error("Cache key not found: {key}")]
    NotFound { key: String },

    #[error("Circuit breaker open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    #[error("Cache {operation} timed out for key '{key}'")]
    Timeout { operation: &'static str, key: String },

    /// Transport or protocol failure reported by the store
    #[error("Cache {operation} failed for key '{key}': {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("Cache client is closed")]
    Closed,

    #[error("Failed to encode cache value for key '{key}': {message}")]
    Encode { key: String, message: String },

    #[error("Failed to decode cache value for key '{key}': {message}")]
    Decode { key: String, message: String },

    /// A recently failed computation remembered by negative caching
    #[error("Cached failure for key '{key}': {message}")]
    CachedFailure { key: String, message: String },

    /// The fetch function passed to `get_or_set` failed
    #[error("Fetch failed for key '{key}': {message}")]
    Fetch { key: String, message: String },
}

impl CacheError {
    /// The store cannot serve requests right now
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            CacheError::CircuitOpen { .. }
                | CacheError::Timeout { .. }
                | CacheError::Backend { .. }
                | CacheError::Closed
        )
    }

    /// The payload could not be marshaled or unmarshaled
    pub fn is_decode(&self) -> bool {
        matches!(self, CacheError::Encode { .. } | CacheError::Decode { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }

    /// Whether the circuit breaker should count this as a store fault
    pub(crate) fn is_store_fault(&self) -> bool {
        matches!(self, CacheError::Timeout { .. } | CacheError::Backend { .. })
    }

    pub(crate) fn backend(operation: &'static str, key: &str, err: impl std::fmt::Display) -> Self {
        CacheError::Backend {
            operation,
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
