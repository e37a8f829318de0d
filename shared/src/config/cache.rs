//! Cache configuration module
//!
//! Covers the Redis connection itself, the circuit breaker wrapped around
//! every store call and the rolling operation metrics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::{var_or, ConfigError};

/// Redis cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis host name or address
    pub host: String,

    /// Redis port
    pub port: u16,

    /// Redis password (empty for none)
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Redis database number (0-15)
    #[serde(default)]
    pub database: u8,

    /// Number of multiplexed connections opened at startup
    pub pool_size: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Per-operation timeout in milliseconds
    pub operation_timeout_ms: u64,

    /// Connection attempts before giving up at startup
    pub connect_retries: u32,

    /// Symmetric TTL jitter as a fraction of the requested TTL
    #[serde(default = "default_ttl_jitter")]
    pub ttl_jitter: f64,

    /// Circuit breaker settings
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// Rolling metrics settings
    #[serde(default)]
    pub metrics: CacheMetricsConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 6379,
            password: String::new(),
            database: 0,
            pool_size: 4,
            connect_timeout_secs: 5,
            operation_timeout_ms: 3000,
            connect_retries: 5,
            ttl_jitter: default_ttl_jitter(),
            circuit_breaker: CircuitBreakerConfig::default(),
            metrics: CacheMetricsConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("REDIS_HOST").unwrap_or(defaults.host),
            port: var_or(&lookup, "REDIS_PORT", defaults.port),
            password: lookup("REDIS_PASSWORD").unwrap_or_default(),
            database: var_or(&lookup, "REDIS_DB", defaults.database).min(15),
            pool_size: var_or(&lookup, "REDIS_POOL_SIZE", defaults.pool_size),
            connect_timeout_secs: var_or(
                &lookup,
                "REDIS_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            ),
            operation_timeout_ms: var_or(
                &lookup,
                "REDIS_OPERATION_TIMEOUT_MS",
                defaults.operation_timeout_ms,
            ),
            connect_retries: var_or(&lookup, "REDIS_CONNECT_RETRIES", defaults.connect_retries),
            ttl_jitter: var_or(&lookup, "CACHE_TTL_JITTER", defaults.ttl_jitter),
            circuit_breaker: CircuitBreakerConfig::from_vars(&lookup),
            metrics: CacheMetricsConfig::from_vars(&lookup),
        }
    }

    /// Create a new cache configuration for a host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the database number
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = db.min(15);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Build the `redis://` connection URL
    pub fn connection_url(&self) -> String {
        if self.password.is_empty() {
            format!("redis://{}:{}/{}", self.host, self.port, self.database)
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                self.password, self.host, self.port, self.database
            )
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("REDIS_HOST", "host is required"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("REDIS_PORT", "port must be positive"));
        }
        if self.pool_size == 0 {
            return Err(ConfigError::invalid(
                "REDIS_POOL_SIZE",
                "pool size must be positive",
            ));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "REDIS_OPERATION_TIMEOUT_MS",
                "operation timeout must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.ttl_jitter) {
            return Err(ConfigError::invalid(
                "CACHE_TTL_JITTER",
                "jitter must be within [0, 1)",
            ));
        }
        self.circuit_breaker.validate()
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() { "" } else { "[REDACTED]" };
        write!(
            f,
            "{{host: {}, port: {}, password: {}, db: {}, pool_size: {}, operation_timeout_ms: {}}}",
            self.host, self.port, password, self.database, self.pool_size, self.operation_timeout_ms
        )
    }
}

/// Circuit breaker configuration for the cache client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircuitBreakerConfig {
    /// Disable to let every call through without bookkeeping
    pub enabled: bool,

    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,

    /// Seconds after the last failure before a probe is allowed
    pub reset_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            reset_timeout_secs: 30,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            enabled: var_or(&lookup, "CACHE_CIRCUIT_BREAKER_ENABLED", defaults.enabled),
            failure_threshold: var_or(
                &lookup,
                "CACHE_CIRCUIT_BREAKER_THRESHOLD",
                defaults.failure_threshold,
            ),
            reset_timeout_secs: var_or(
                &lookup,
                "CACHE_CIRCUIT_BREAKER_TIMEOUT_SECS",
                defaults.reset_timeout_secs,
            ),
        }
    }

    /// Breaker with a custom threshold and cool-down
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            enabled: true,
            failure_threshold,
            reset_timeout_secs: reset_timeout.as_secs(),
        }
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_secs(self.reset_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "CACHE_CIRCUIT_BREAKER_THRESHOLD",
                "threshold must be positive",
            ));
        }
        Ok(())
    }
}

/// Rolling metrics configuration for the cache client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheMetricsConfig {
    /// Enable operation metrics
    pub enabled: bool,

    /// Flush after this many requests in the current window
    pub flush_every_requests: u64,

    /// Flush once the window is older than this many seconds
    pub flush_interval_secs: u64,
}

impl Default for CacheMetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_every_requests: 1000,
            flush_interval_secs: 60,
        }
    }
}

impl CacheMetricsConfig {
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            enabled: var_or(&lookup, "CACHE_METRICS_ENABLED", defaults.enabled),
            flush_every_requests: var_or(
                &lookup,
                "CACHE_METRICS_FLUSH_EVERY",
                defaults.flush_every_requests,
            ),
            flush_interval_secs: var_or(
                &lookup,
                "CACHE_METRICS_FLUSH_INTERVAL_SECS",
                defaults.flush_interval_secs,
            ),
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}

fn default_ttl_jitter() -> f64 {
    0.1
}
