//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `cache` - Redis connection, circuit breaker and cache metrics
//! - `environment` - Environment detection and logging configuration
//! - `otp` - One-time code generation and verification
//!
//! Every struct is built explicitly (`from_env` / `from_vars`) and handed to
//! the component that needs it; nothing reads configuration lazily.

pub mod cache;
pub mod environment;
pub mod otp;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheMetricsConfig, CircuitBreakerConfig};
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::OtpConfig;

/// Configuration validation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Cache configuration
    pub cache: CacheConfig,

    /// One-time code configuration
    pub otp: OtpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            cache: CacheConfig::default(),
            otp: OtpConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = Environment::from_vars(&lookup);
        Self {
            environment,
            cache: CacheConfig::from_vars(&lookup),
            otp: OtpConfig::from_vars(&lookup),
            logging: LoggingConfig::from_vars(environment, &lookup),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.otp.validate()
    }
}

/// Parse `key` through `lookup`, falling back to `default` when missing or malformed
pub(crate) fn var_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_from_vars() {
        let config = AppConfig::from_vars(|key| match key {
            "APP_ENV" => Some("staging".to_string()),
            "REDIS_HOST" => Some("redis".to_string()),
            "OTP_MAX_ATTEMPTS" => Some("4".to_string()),
            _ => None,
        });

        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.cache.host, "redis");
        assert_eq!(config.otp.max_attempts, 4);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_var_or_trims_and_falls_back() {
        let lookup = |key: &str| match key {
            "A" => Some(" 12 ".to_string()),
            "B" => Some("twelve".to_string()),
            _ => None,
        };
        assert_eq!(var_or(&lookup, "A", 0u32), 12);
        assert_eq!(var_or(&lookup, "B", 3u32), 3);
        assert_eq!(var_or(&lookup, "C", 9u32), 9);
    }

    #[test]
    fn test_validate_reports_field() {
        let mut config = AppConfig::default();
        config.otp.max_attempts = 0;
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "OTP_MAX_ATTEMPTS"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
