pub mod config;
pub mod error;

pub use config::{
    Config, FeedConfig, LoggingConfig, RefreshRate, StorageConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
    WeatherError,
};

use anyhow::Result;

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str) -> Result<()> {
    let fallback = tracing_subscriber::EnvFilter::try_new(default_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or(fallback))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("SkyCache core initialized");
    Ok(())
}
