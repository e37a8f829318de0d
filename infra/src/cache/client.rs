//! Remote cache client: circuit breaker, timeouts and metrics around a store

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info};

use uptime_shared::config::CacheConfig;

use super::circuit_breaker::{CircuitBreaker, CircuitState};
use super::error::{CacheError, CacheResult};
use super::metrics::{CacheMetrics, MetricsSnapshot, Outcome};
use super::store::CacheStore;

/// Point-in-time view of the client's health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    pub circuit_state: CircuitState,
    pub failure_count: u32,
}

/// Byte-level cache client
///
/// Every call is admitted by the circuit breaker, bounded by the operation
/// timeout and tagged in the rolling metrics. Dropping a call's future
/// cancels the store operation.
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    breaker: CircuitBreaker,
    metrics: CacheMetrics,
    operation_timeout: Duration,
    closed: AtomicBool,
}

impl CacheClient {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
            metrics: CacheMetrics::new(config.metrics.clone()),
            operation_timeout: config.operation_timeout(),
            closed: AtomicBool::new(false),
        }
    }

    /// `Ok(None)` on a miss
    pub async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.execute(
            "get",
            key,
            |value: &Option<Vec<u8>>| match value {
                Some(_) => Outcome::Hit,
                None => Outcome::Miss,
            },
            || self.store.get(key),
        )
        .await
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.execute("set", key, |_| Outcome::Success, || self.store.set(key, value, ttl))
            .await
    }

    /// Replace an existing value and keep its TTL; `CacheError::NotFound` if absent
    pub async fn update(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.execute("update", key, |_| Outcome::Success, || self.store.update(key, value))
            .await
    }

    /// Returns whether a key was removed
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.execute("delete", key, |_| Outcome::Success, || self.store.delete(key))
            .await
    }

    pub async fn increment(&self, key: &str) -> CacheResult<i64> {
        self.execute("increment", key, |_| Outcome::Success, || self.store.increment(key))
            .await
    }

    pub async fn decrement(&self, key: &str) -> CacheResult<i64> {
        self.execute("decrement", key, |_| Outcome::Success, || self.store.decrement(key))
            .await
    }

    pub async fn health_check(&self) -> CacheResult<()> {
        self.execute("health_check", "", |_| Outcome::Success, || self.store.ping())
            .await
    }

    /// Release the store; every later call fails with `CacheError::Closed`
    pub async fn close(&self) -> CacheResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        info!(stats = ?self.stats(), "Closing cache client");
        self.store.close().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            metrics: self.metrics.snapshot(),
            circuit_state: self.breaker.state(),
            failure_count: self.breaker.failure_count(),
        }
    }

    async fn execute<T, C, F, Fut>(
        &self,
        operation: &'static str,
        key: &str,
        classify: C,
        call: F,
    ) -> CacheResult<T>
    where
        C: FnOnce(&T) -> Outcome,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }

        let started = Instant::now();
        let permit = match self.breaker.try_acquire() {
            Ok(permit) => permit,
            Err(e) => {
                self.metrics.record(Outcome::Error, started.elapsed());
                debug!(operation, key, error = %e, "Cache call short-circuited");
                return Err(e);
            }
        };

        let result = match timeout(self.operation_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation,
                key: key.to_string(),
            }),
        };
        let latency = started.elapsed();

        match &result {
            Ok(value) => {
                self.metrics.record(classify(value), latency);
                permit.success();
            }
            // The store answered; a missing key is not a fault.
            Err(CacheError::NotFound { .. }) => {
                self.metrics.record(Outcome::Miss, latency);
                permit.success();
            }
            Err(e) if e.is_store_fault() => {
                self.metrics.record(Outcome::Error, latency);
                permit.failure();
                error!(operation, key, error = %e, "Cache operation failed");
            }
            Err(e) => {
                self.metrics.record(Outcome::Error, latency);
                drop(permit);
                debug!(operation, key, error = %e, "Cache operation rejected");
            }
        }

        result
    }
}
