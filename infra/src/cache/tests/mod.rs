
use std::sync::Arc;
use std::time::Duration;

use uptime_shared::config::{CacheConfig, CircuitBreakerConfig};

use super::{CacheClient, MemoryStore};

/// Client over a fresh memory store with the given breaker settings
pub(super) fn client_with(threshold: u32, reset: Duration) -> (Arc<CacheClient>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mut config = CacheConfig::default();
    config.circuit_breaker = CircuitBreakerConfig::new(threshold, reset);
    let client = Arc::new(CacheClient::new(store.clone(), &config));
    (client, store)
}

pub(super) fn backend_down() -> super::CacheError {
    super::CacheError::backend("get", "", "connection refused")
}
