//! Per-key deduplication of in-flight work

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Collapses concurrent calls for the same key onto one execution
///
/// The first caller for a key runs its closure; callers arriving while it is
/// in flight wait and receive a clone of the same result. Once the call
/// completes the key is forgotten, so the next caller starts fresh. If the
/// running caller is cancelled, one of the waiters takes over.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key` unless a call for it is already in flight.
    ///
    /// Returns the result and whether it was shared from another caller.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut calls = self.calls.lock();
            calls
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let mut executed = false;
        let value = cell
            .get_or_init(|| {
                executed = true;
                work()
            })
            .await
            .clone();

        {
            let mut calls = self.calls.lock();
            if calls.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
                calls.remove(key);
            }
        }

        (value, !executed)
    }

    /// Keys with a call in flight
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
