//! Storage backend abstraction under the cache client

use async_trait::async_trait;
use std::time::Duration;

use super::error::CacheResult;

/// Raw byte-level key/value operations a cache backend must provide
///
/// Implementations report faults only; circuit breaking, timeouts and
/// metrics are layered on by [`CacheClient`](super::CacheClient).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when the key is absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Write `value` with a lifetime; a zero `ttl` stores without expiry
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Replace the value of an existing key, keeping its remaining lifetime
    ///
    /// Fails with `CacheError::NotFound` when the key does not exist.
    async fn update(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    /// Returns whether a key was removed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    async fn increment(&self, key: &str) -> CacheResult<i64>;

    async fn decrement(&self, key: &str) -> CacheResult<i64>;

    /// Liveness probe
    async fn ping(&self) -> CacheResult<()>;

    /// Release connections; later calls fail with `CacheError::Closed`
    async fn close(&self) -> CacheResult<()>;
}
