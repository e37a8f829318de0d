//! # Infrastructure Layer
//!
//! Concrete implementations behind the core crate's contracts:
//! - **Cache**: Redis store, circuit-breaking cache client and the cache service
//! - **Repositories**: OTP persistence through the cache service
//! - **Telemetry**: tracing subscriber setup
//!
//! [`bootstrap`] wires the whole OTP stack from an [`AppConfig`].

use std::sync::Arc;

use uptime_core::services::{OtpEngine, OtpService};
use uptime_shared::config::{AppConfig, ConfigError};

pub mod cache;
pub mod repositories;
pub mod telemetry;

use cache::{CacheClient, CacheError, CacheService, CacheStore, RedisStore};
use repositories::CacheOtpRepository;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cache store error
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Fully wired OTP services sharing one cache client
#[derive(Clone)]
pub struct OtpStack {
    pub cache: Arc<CacheService>,
    pub repository: Arc<CacheOtpRepository>,
    pub otp: Arc<OtpService<CacheOtpRepository>>,
}

/// Load configuration from the environment, reading `.env` if present
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();
    config.validate()?;
    Ok(config)
}

/// Connect to Redis and build the OTP stack
pub async fn bootstrap(config: &AppConfig) -> Result<OtpStack, InfrastructureError> {
    config.validate()?;
    tracing::info!(environment = %config.environment, "Initializing infrastructure services");

    let store = RedisStore::connect(&config.cache).await?;
    let stack = build_stack(Arc::new(store), config);

    tracing::info!("Infrastructure services initialized");
    Ok(stack)
}

/// Build the OTP stack over any cache store
pub fn build_stack(store: Arc<dyn CacheStore>, config: &AppConfig) -> OtpStack {
    let client = Arc::new(CacheClient::new(store, &config.cache));
    let cache = Arc::new(CacheService::new(client, config.cache.ttl_jitter));
    let repository = Arc::new(CacheOtpRepository::new(cache.clone()));
    let otp = Arc::new(OtpService::new(
        repository.clone(),
        OtpEngine::new(config.otp.clone()),
    ));

    OtpStack {
        cache,
        repository,
        otp,
    }
}
