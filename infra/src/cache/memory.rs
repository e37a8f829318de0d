//! In-memory [`CacheStore`] for tests and local runs
//!
//! Expiry follows the tokio clock, so paused-time tests can advance past a
//! TTL. Faults can be injected to drive the circuit breaker.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::error::{CacheError, CacheResult};
use super::store::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Map-backed store with TTLs, fault injection and a call counter
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    failure: Mutex<Option<CacheError>>,
    calls: AtomicUsize,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call with `err` until [`MemoryStore::recover`]
    pub fn fail_with(&self, err: CacheError) {
        *self.failure.lock() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Calls that reached the store, failed ones included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Remaining lifetime of a live key; `None` when absent or stored without expiry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.expires_at)
            .map(|at| at - now)
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries.lock().get(key).is_some_and(|entry| entry.is_live(now))
    }

    /// Raw bytes of a live key
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn enter(&self) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        match self.failure.lock().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn add(&self, operation: &'static str, key: &str, delta: i64) -> CacheResult<i64> {
        self.enter()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let (current, expires_at) = match entries.get(key).filter(|entry| entry.is_live(now)) {
            Some(entry) => {
                let current = std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|text| text.parse::<i64>().ok())
                    .ok_or_else(|| {
                        CacheError::backend(operation, key, "value is not an integer or out of range")
                    })?;
                (current, entry.expires_at)
            }
            None => (0, None),
        };

        let next = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::backend(operation, key, "increment or decrement would overflow"))?;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string().into_bytes(),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.enter()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.enter()?;
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn update(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.enter()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.value = value.to_vec();
                Ok(())
            }
            _ => {
                entries.remove(key);
                Err(CacheError::NotFound { key: key.to_string() })
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.enter()?;
        let now = Instant::now();
        Ok(self
            .entries
            .lock()
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn increment(&self, key: &str) -> CacheResult<i64> {
        self.add("increment", key, 1)
    }

    async fn decrement(&self, key: &str) -> CacheResult<i64> {
        self.add("decrement", key, -1)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.enter()
    }

    async fn close(&self) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        self.entries.lock().clear();
        Ok(())
    }
}
