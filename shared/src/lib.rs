//! Shared configuration and utilities for the uptime backend
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types loaded from the environment
//! - Configuration validation errors
//! - Utility functions (identifier masking for logs)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, CacheMetricsConfig, CircuitBreakerConfig, ConfigError, Environment,
    LogFormat, LoggingConfig, OtpConfig,
};
pub use utils::mask_identifier;
