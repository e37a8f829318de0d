//! Circuit breaker guarding the remote cache store.
//!
//! ```text
//! ┌────────┐  N failures   ┌──────┐  reset_timeout  ┌───────────┐
//! │ Closed ├──────────────►│ Open ├────────────────►│ Half-Open │
//! └────┬───┘               └──────┘                 └─────┬─────┘
//!      ▲                       ▲       probe failure      │
//!      │                       └──────────────────────────┤
//!      │                 probe success                    │
//!      └──────────────────────────────────────────────────┘
//! ```
//!
//! While Open no store call is attempted. Half-Open admits a single probe;
//! other callers are rejected until it resolves.

use parking_lot::RwLock;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use uptime_shared::config::CircuitBreakerConfig;

use super::error::CacheError;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls flow through.
    Closed,

    /// Tripped, calls are rejected without touching the store.
    Open,

    /// Cool-down elapsed, one probe call decides the next state.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,

    /// Consecutive store faults while Closed
    failure_count: u32,

    /// Cool-down is measured from here
    last_failure: Option<Instant>,

    probe_in_flight: bool,
}

/// Three-state breaker scoped to one cache client.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<BreakerState>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                probe_in_flight: false,
            }),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Ask to make one store call.
    ///
    /// Returns `Err(CacheError::CircuitOpen)` while the breaker is Open and the
    /// cool-down has not elapsed, or while a Half-Open probe is in flight.
    /// Once the cool-down has elapsed the caller is admitted as the probe.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, CacheError> {
        if !self.config.enabled {
            return Ok(CallPermit::new(self, PermitKind::Untracked));
        }

        let reset_timeout = self.config.reset_timeout();
        let mut inner = self.state.write();

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, PermitKind::Normal)),
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    return Err(CacheError::CircuitOpen {
                        retry_after: Duration::ZERO,
                    });
                }
                inner.probe_in_flight = true;
                Ok(CallPermit::new(self, PermitKind::Probe))
            }
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| at.elapsed())
                    .unwrap_or(reset_timeout);

                if elapsed < reset_timeout {
                    return Err(CacheError::CircuitOpen {
                        retry_after: reset_timeout - elapsed,
                    });
                }

                inner.state = CircuitState::HalfOpen;
                inner.probe_in_flight = true;
                tracing::warn!(
                    from = %CircuitState::Open,
                    to = %CircuitState::HalfOpen,
                    reset_timeout_ms = reset_timeout.as_millis() as u64,
                    "circuit breaker state transition: allowing probe request"
                );
                Ok(CallPermit::new(self, PermitKind::Probe))
            }
        }
    }

    /// Current state as last recorded.
    pub fn state(&self) -> CircuitState {
        self.state.read().state
    }

    pub fn failure_count(&self) -> u32 {
        self.state.read().failure_count
    }

    fn record_success(&self, kind: PermitKind) {
        let mut inner = self.state.write();
        match (inner.state, kind) {
            (CircuitState::Closed, _) => {
                inner.failure_count = 0;
            }
            (CircuitState::HalfOpen, PermitKind::Probe) => {
                inner.state = CircuitState::Closed;
                inner.failure_count = 0;
                inner.probe_in_flight = false;
                tracing::info!(
                    from = %CircuitState::HalfOpen,
                    to = %CircuitState::Closed,
                    "circuit breaker state transition: recovery confirmed"
                );
            }
            // Late results from calls admitted before the breaker tripped
            // do not decide recovery.
            _ => {}
        }
    }

    fn record_failure(&self, kind: PermitKind) {
        let mut inner = self.state.write();
        let now = Instant::now();

        match (inner.state, kind) {
            (CircuitState::Closed, _) => {
                inner.failure_count += 1;
                inner.last_failure = Some(now);

                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    tracing::error!(
                        from = %CircuitState::Closed,
                        to = %CircuitState::Open,
                        failure_threshold = self.config.failure_threshold,
                        failure_count = inner.failure_count,
                        "circuit breaker state transition: store marked unavailable"
                    );
                }
            }
            (CircuitState::HalfOpen, PermitKind::Probe) => {
                inner.state = CircuitState::Open;
                inner.failure_count = 0;
                inner.last_failure = Some(now);
                inner.probe_in_flight = false;
                tracing::error!(
                    from = %CircuitState::HalfOpen,
                    to = %CircuitState::Open,
                    "circuit breaker state transition: probe failed, reopening"
                );
            }
            (CircuitState::Open, _) => {
                inner.last_failure = Some(now);
            }
            _ => {}
        }
    }

    fn release_probe(&self) {
        let mut inner = self.state.write();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermitKind {
    /// Breaker disabled, nothing is recorded
    Untracked,
    Normal,
    Probe,
}

/// Admission for one store call; report its outcome with
/// [`success`](CallPermit::success) or [`failure`](CallPermit::failure).
///
/// Dropping an unreported probe permit frees the probe slot without
/// changing state, so a cancelled probe does not wedge the breaker.
#[must_use]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    kind: PermitKind,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, kind: PermitKind) -> Self {
        Self {
            breaker,
            kind,
            settled: false,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.kind == PermitKind::Probe
    }

    /// The store answered.
    pub fn success(mut self) {
        self.settled = true;
        if self.kind != PermitKind::Untracked {
            self.breaker.record_success(self.kind);
        }
    }

    /// The store faulted or timed out.
    pub fn failure(mut self) {
        self.settled = true;
        if self.kind != PermitKind::Untracked {
            self.breaker.record_failure(self.kind);
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.kind == PermitKind::Probe {
            self.breaker.release_probe();
        }
    }
}
