//! Redis backend for the cache client
//!
//! Holds a small pool of multiplexed connections opened up front, each with
//! exponential-backoff retry. Operations are dispatched round-robin and are
//! never retried here; fault handling belongs to the circuit breaker above.

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use uptime_shared::config::CacheConfig;

use super::error::{CacheError, CacheResult};
use super::store::CacheStore;

/// First reconnect delay; doubled per attempt up to [`MAX_RETRY_DELAY_MS`]
const BASE_RETRY_DELAY_MS: u64 = 100;
const MAX_RETRY_DELAY_MS: u64 = 5000;

/// Redis-backed [`CacheStore`]
pub struct RedisStore {
    /// Emptied on close
    connections: RwLock<Vec<MultiplexedConnection>>,
    next: AtomicUsize,
}

impl RedisStore {
    /// Connect `pool_size` multiplexed connections to the configured server
    ///
    /// # Example
    /// ```no_run
    /// use uptime_infra::cache::RedisStore;
    /// use uptime_shared::config::CacheConfig;
    ///
    /// async fn connect() -> Result<RedisStore, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("127.0.0.1", 6379).with_database(2);
    ///     Ok(RedisStore::connect(&config).await?)
    /// }
    /// ```
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        info!(config = %config, "Connecting to Redis");

        let client = Client::open(config.connection_url()).map_err(|e| {
            error!(error = %e, "Invalid Redis connection settings");
            CacheError::backend("connect", "", e)
        })?;

        let pool_size = config.pool_size.max(1) as usize;
        let mut connections = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let connection = Self::create_connection_with_retry(
                &client,
                config.connect_retries.max(1),
                config.connect_timeout(),
            )
            .await?;
            connections.push(connection);
        }

        info!(pool_size, "Redis store ready");

        Ok(Self {
            connections: RwLock::new(connections),
            next: AtomicUsize::new(0),
        })
    }

    async fn create_connection_with_retry(
        client: &Client,
        max_attempts: u32,
        connect_timeout: Duration,
    ) -> CacheResult<MultiplexedConnection> {
        let mut attempts = 0;
        let mut delay = BASE_RETRY_DELAY_MS;

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Attempting to connect to Redis");

            let outcome = match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(Ok(connection)) => return Ok(connection),
                Ok(Err(e)) => CacheError::backend("connect", "", e),
                Err(_) => CacheError::Timeout {
                    operation: "connect",
                    key: String::new(),
                },
            };

            if attempts >= max_attempts {
                error!(attempts, error = %outcome, "Failed to connect to Redis");
                return Err(outcome);
            }

            warn!(
                attempt = attempts,
                max_attempts,
                retry_in_ms = delay,
                error = %outcome,
                "Redis connection attempt failed, retrying"
            );
            sleep(Duration::from_millis(delay)).await;
            delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
        }
    }

    /// Next connection in round-robin order
    fn connection(&self) -> CacheResult<MultiplexedConnection> {
        let connections = self.connections.read();
        if connections.is_empty() {
            return Err(CacheError::Closed);
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % connections.len();
        Ok(connections[index].clone())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection()?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::backend("get", key, e))?;

        if value.is_some() {
            debug!(key, "Cache hit");
        } else {
            debug!(key, "Cache miss");
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if !ttl.is_zero() {
            // PX keeps sub-second jitter instead of truncating to whole seconds
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| CacheError::backend("set", key, e))?;

        debug!(key, ttl_ms = ttl.as_millis() as u64, "Cache set");
        Ok(())
    }

    async fn update(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        let mut conn = self.connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("XX")
            .arg("KEEPTTL")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("update", key, e))?;

        match reply {
            Some(_) => {
                debug!(key, "Cache update");
                Ok(())
            }
            None => Err(CacheError::NotFound { key: key.to_string() }),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection()?;
        let removed: u32 = conn
            .del(key)
            .await
            .map_err(|e| CacheError::backend("delete", key, e))?;
        debug!(key, removed, "Cache delete");
        Ok(removed > 0)
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.connection()?;
        conn.incr(key, 1)
            .await
            .map_err(|e| CacheError::backend("increment", key, e))
    }

    async fn decrement(&self, key: &str) -> CacheResult<i64> {
        let mut conn = self.connection()?;
        conn.decr(key, 1)
            .await
            .map_err(|e| CacheError::backend("decrement", key, e))
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection()?;
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend("ping", "", e))?;

        if response != "PONG" {
            return Err(CacheError::backend(
                "ping",
                "",
                format!("unexpected response: {}", response),
            ));
        }
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        let mut connections = self.connections.write();
        if connections.is_empty() {
            return Err(CacheError::Closed);
        }
        connections.clear();
        info!("Redis connections released");
        Ok(())
    }
}
