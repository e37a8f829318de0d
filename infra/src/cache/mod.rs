//! Cache module for Redis-based caching
//!
//! Layers, bottom up:
//! - [`CacheStore`]: byte-level backend ([`RedisStore`], [`MemoryStore`])
//! - [`CacheClient`]: circuit breaker, operation timeout, rolling metrics
//! - [`CacheService`]: JSON values, TTL jitter, negative caching, single-flight

pub mod circuit_breaker;
pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod redis_store;
pub mod service;
pub mod single_flight;
pub mod store;

#[cfg(test)]
mod tests;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitState};
pub use client::{CacheClient, CacheStats};
pub use error::{CacheError, CacheResult};
pub use memory::MemoryStore;
pub use metrics::{CacheMetrics, MetricsSnapshot, Outcome};
pub use redis_store::RedisStore;
pub use service::{CacheService, NEGATIVE_CACHE_PREFIX, NEGATIVE_CACHE_TTL};
pub use single_flight::SingleFlight;
pub use store::CacheStore;

// Re-export commonly used types
pub use uptime_shared::config::CacheConfig;
