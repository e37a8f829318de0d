//! In-process advisory locks keyed by OTP storage key.
//!
//! Verification is read-decide-write against a store without transactions.
//! Holding the key's lock across that sequence keeps two concurrent calls for
//! the same `(purpose, identifier)` from losing an attempt increment. This
//! only holds when every call for an identifier reaches the same process.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus waiters; the slot is dropped when this reaches zero
    users: usize,
}

#[derive(Default)]
pub(crate) struct KeyedLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl KeyedLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub(crate) async fn acquire(&self, key: &str) -> KeyedGuard<'_> {
        let lock = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.to_owned()).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.lock.clone()
        };
        // Registered before waiting so a cancelled waiter still deregisters.
        let registration = Registration {
            locks: self,
            key: key.to_owned(),
        };
        let guard = lock.lock_owned().await;

        KeyedGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of keys currently held or waited on
    #[cfg(test)]
    pub(crate) fn active_keys(&self) -> usize {
        self.slots.lock().len()
    }
}

/// Exclusive access to one key; released on drop
pub(crate) struct KeyedGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a>,
}

struct Registration<'a> {
    locks: &'a KeyedLocks,
    key: String,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}
