//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use uptime_shared::config::{LogFormat, LoggingConfig};

use crate::InfrastructureError;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set. Fails, without
/// panicking, if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| InfrastructureError::Telemetry(format!("invalid log level '{}': {}", config.level, e)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.colored)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|e| InfrastructureError::Telemetry(e.to_string()))
}
