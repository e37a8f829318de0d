//! Rolling operation metrics for the cache client
//!
//! Counters accumulate in a window that is logged and reset once it holds
//! `flush_every_requests` requests or is older than `flush_interval`.

use parking_lot::RwLock;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use uptime_shared::config::CacheMetricsConfig;

/// Coarse outcome tag of one client call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    Success,
    Error,
}

#[derive(Debug)]
struct Window {
    requests: u64,
    errors: u64,
    hits: u64,
    misses: u64,
    successes: u64,
    latency: Duration,
    started: Instant,
}

impl Window {
    fn new() -> Self {
        Self {
            requests: 0,
            errors: 0,
            hits: 0,
            misses: 0,
            successes: 0,
            latency: Duration::ZERO,
            started: Instant::now(),
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let avg_latency_us = if self.requests == 0 {
            0
        } else {
            self.latency.as_micros() / u128::from(self.requests)
        };
        MetricsSnapshot {
            requests: self.requests,
            errors: self.errors,
            hits: self.hits,
            misses: self.misses,
            successes: self.successes,
            avg_latency_us: u64::try_from(avg_latency_us).unwrap_or(u64::MAX),
        }
    }
}

/// Counters of the current window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub hits: u64,
    pub misses: u64,
    pub successes: u64,
    pub avg_latency_us: u64,
}

#[derive(Debug)]
pub struct CacheMetrics {
    window: RwLock<Window>,
    config: CacheMetricsConfig,
}

impl CacheMetrics {
    pub fn new(config: CacheMetricsConfig) -> Self {
        Self {
            window: RwLock::new(Window::new()),
            config,
        }
    }

    pub fn record(&self, outcome: Outcome, latency: Duration) {
        if !self.config.enabled {
            return;
        }

        let flushed = {
            let mut window = self.window.write();
            window.requests += 1;
            window.latency += latency;
            match outcome {
                Outcome::Hit => window.hits += 1,
                Outcome::Miss => window.misses += 1,
                Outcome::Success => window.successes += 1,
                Outcome::Error => window.errors += 1,
            }

            let by_count = self.config.flush_every_requests > 0
                && window.requests % self.config.flush_every_requests == 0;
            let by_age = window.started.elapsed() >= self.config.flush_interval();
            if by_count || by_age {
                let snapshot = window.snapshot();
                *window = Window::new();
                Some(snapshot)
            } else {
                None
            }
        };

        if let Some(snapshot) = flushed {
            tracing::info!(
                requests = snapshot.requests,
                errors = snapshot.errors,
                hits = snapshot.hits,
                misses = snapshot.misses,
                successes = snapshot.successes,
                avg_latency_us = snapshot.avg_latency_us,
                "Cache metrics"
            );
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.window.read().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(flush_every_requests: u64) -> CacheMetrics {
        CacheMetrics::new(CacheMetricsConfig {
            enabled: true,
            flush_every_requests,
            flush_interval_secs: 60,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_by_outcome() {
        let metrics = metrics(1000);
        metrics.record(Outcome::Hit, Duration::from_micros(100));
        metrics.record(Outcome::Miss, Duration::from_micros(300));
        metrics.record(Outcome::Error, Duration::from_micros(200));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.avg_latency_us, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_by_count() {
        let metrics = metrics(3);
        for _ in 0..3 {
            metrics.record(Outcome::Success, Duration::from_micros(10));
        }
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());

        metrics.record(Outcome::Success, Duration::from_micros(10));
        assert_eq!(metrics.snapshot().requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_by_age() {
        let metrics = metrics(1000);
        metrics.record(Outcome::Success, Duration::from_micros(10));
        tokio::time::advance(Duration::from_secs(61)).await;
        metrics.record(Outcome::Success, Duration::from_micros(10));
        assert_eq!(metrics.snapshot().requests, 0);
    }

    #[tokio::test]
    async fn test_average_over_huge_window() {
        let requests = u64::from(u32::MAX) + 5_000;
        let window = Window {
            requests,
            latency: Duration::from_micros(requests * 3),
            ..Window::new()
        };
        assert_eq!(window.snapshot().avg_latency_us, 3);
    }

    #[tokio::test]
    async fn test_disabled_records_nothing() {
        let metrics = CacheMetrics::new(CacheMetricsConfig {
            enabled: false,
            ..CacheMetricsConfig::default()
        });
        metrics.record(Outcome::Hit, Duration::from_millis(1));
        assert_eq!(metrics.snapshot().requests, 0);
    }
}
