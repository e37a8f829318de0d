//! Application-facing cache service
//!
//! Adds JSON marshaling, TTL jitter, negative caching and single-flight
//! `get_or_set` on top of [`CacheClient`].

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::client::CacheClient;
use super::error::{CacheError, CacheResult};
use super::single_flight::SingleFlight;

/// Marks a payload as a remembered failure rather than a value
pub const NEGATIVE_CACHE_PREFIX: &[u8] = b"ERR:";

/// Lifetime of a remembered failure
pub const NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(60);

pub struct CacheService {
    client: Arc<CacheClient>,
    /// Symmetric jitter fraction, `0.1` means +/-10%
    ttl_jitter: f64,
    rng: Mutex<StdRng>,
    flights: SingleFlight<CacheResult<Vec<u8>>>,
}

impl CacheService {
    pub fn new(client: Arc<CacheClient>, ttl_jitter: f64) -> Self {
        Self::with_rng(client, ttl_jitter, StdRng::from_entropy())
    }

    /// Deterministic jitter for reproducible tests
    pub fn with_seed(client: Arc<CacheClient>, ttl_jitter: f64, seed: u64) -> Self {
        Self::with_rng(client, ttl_jitter, StdRng::seed_from_u64(seed))
    }

    fn with_rng(client: Arc<CacheClient>, ttl_jitter: f64, rng: StdRng) -> Self {
        Self {
            client,
            ttl_jitter: if ttl_jitter.is_finite() {
                ttl_jitter.clamp(0.0, 0.99)
            } else {
                0.0
            },
            rng: Mutex::new(rng),
            flights: SingleFlight::new(),
        }
    }

    pub fn client(&self) -> &Arc<CacheClient> {
        &self.client
    }

    /// `ttl` scaled by a uniform factor in `[1 - jitter, 1 + jitter]`
    ///
    /// A zero TTL (no expiry) is left alone.
    pub fn jittered_ttl(&self, ttl: Duration) -> Duration {
        if ttl.is_zero() || self.ttl_jitter == 0.0 {
            return ttl;
        }
        let factor = self
            .rng
            .lock()
            .gen_range(-self.ttl_jitter..=self.ttl_jitter);
        ttl.mul_f64(1.0 + factor)
    }

    /// Marshal `value` and store it under `key` with a jittered TTL
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> CacheResult<()> {
        let bytes = encode(key, value)?;
        let jittered = self.jittered_ttl(ttl);
        debug!(
            key,
            ttl_ms = ttl.as_millis() as u64,
            jittered_ttl_ms = jittered.as_millis() as u64,
            "Setting cache value with jitter"
        );
        self.client.set(key, &bytes, jittered).await
    }

    /// `Ok(None)` on a miss; a remembered failure surfaces as
    /// `CacheError::CachedFailure`
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        match self.client.get(key).await? {
            Some(bytes) => decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the value of an existing key, keeping its TTL
    pub async fn update<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> CacheResult<()> {
        let bytes = encode(key, value)?;
        self.client.update(key, &bytes).await
    }

    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.client.delete(key).await
    }

    pub async fn increment(&self, key: &str) -> CacheResult<i64> {
        self.client.increment(key).await
    }

    pub async fn decrement(&self, key: &str) -> CacheResult<i64> {
        self.client.decrement(key).await
    }

    pub async fn health_check(&self) -> CacheResult<()> {
        self.client.health_check().await
    }

    pub async fn close(&self) -> CacheResult<()> {
        self.client.close().await
    }

    /// Remember that computing `key` just failed
    pub async fn set_failure(&self, key: &str, message: &str) -> CacheResult<()> {
        let mut payload = Vec::with_capacity(NEGATIVE_CACHE_PREFIX.len() + message.len());
        payload.extend_from_slice(NEGATIVE_CACHE_PREFIX);
        payload.extend_from_slice(message.as_bytes());
        self.client.set(key, &payload, NEGATIVE_CACHE_TTL).await
    }

    /// Read `key`, computing and storing it with `fetch` on a miss
    ///
    /// Concurrent callers for the same key share one `fetch`. A failed fetch
    /// is remembered for [`NEGATIVE_CACHE_TTL`] and returned to every waiter
    /// as `CacheError::Fetch`; later callers see `CacheError::CachedFailure`
    /// until it expires. Store errors are returned, never treated as a miss.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> CacheResult<T>
    where
        T: Serialize + DeserializeOwned,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get::<T>(key).await? {
            return Ok(value);
        }

        info!(key, "Cache miss, fetching with single-flight");

        let (result, shared) = self
            .flights
            .run(key, || self.fetch_and_store(key, ttl, fetch))
            .await;

        if shared {
            debug!(key, "Shared in-flight fetch result");
        }

        decode(key, &result?)
    }

    async fn fetch_and_store<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> CacheResult<Vec<u8>>
    where
        T: Serialize,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // A caller that joins after the previous flight finished finds the
        // value already stored.
        if let Some(bytes) = self.client.get(key).await? {
            return Ok(bytes);
        }

        match fetch().await {
            Ok(value) => {
                let bytes = encode(key, &value)?;
                self.client
                    .set(key, &bytes, self.jittered_ttl(ttl))
                    .await
                    .map_err(|e| {
                        error!(key, error = %e, "Failed to store fetched value");
                        e
                    })?;
                Ok(bytes)
            }
            Err(e) => {
                let message = e.to_string();
                error!(key, error = %message, "Fetch function failed");
                if let Err(set_err) = self.set_failure(key, &message).await {
                    warn!(key, error = %set_err, "Failed to cache fetch failure");
                }
                Err(CacheError::Fetch {
                    key: key.to_string(),
                    message,
                })
            }
        }
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> CacheResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        error!(key, error = %e, "Failed to marshal cache value");
        CacheError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        }
    })
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> CacheResult<T> {
    if let Some(message) = bytes.strip_prefix(NEGATIVE_CACHE_PREFIX) {
        let message = String::from_utf8_lossy(message).into_owned();
        warn!(key, cached_error = %message, "Retrieved cached failure");
        return Err(CacheError::CachedFailure {
            key: key.to_string(),
            message,
        });
    }

    serde_json::from_slice(bytes).map_err(|e| {
        error!(key, error = %e, "Failed to unmarshal cache value");
        CacheError::Decode {
            key: key.to_string(),
            message: e.to_string(),
        }
    })
}
