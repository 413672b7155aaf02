//! Tracing subscriber setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a JSON or
//! pretty fmt layer. `RUST_LOG` wins over the configured filter.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, TelemetryConfig};
use crate::error::ClientError;

/// Filter used by the sample configuration.
pub const DEFAULT_LOG_FILTER: &str = "stowage=debug,info";

/// Build the filter: `RUST_LOG` if set, otherwise the configured directives.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, ClientError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|e| {
            ClientError::Telemetry(format!("Invalid log filter {:?}: {}", config.log_filter, e))
        }),
    }
}

/// Install the global subscriber. Call once at start-up.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ClientError> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    }
    .map_err(|e| ClientError::Telemetry(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(log_format = ?config.log_format, "Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn remove(key: &'static str) -> Self {
            let original = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn config(filter: &str) -> TelemetryConfig {
        TelemetryConfig {
            log_filter: filter.to_string(),
            log_format: LogFormat::Json,
        }
    }

    #[test]
    fn test_env_filter_uses_configured_directives() {
        let _guard = EnvVarGuard::remove("RUST_LOG");
        let filter = env_filter(&config(DEFAULT_LOG_FILTER)).unwrap();
        assert!(filter.to_string().contains("stowage=debug"));
    }

    #[test]
    fn test_env_filter_rejects_garbage() {
        let _guard = EnvVarGuard::remove("RUST_LOG");
        let err = env_filter(&config("stowage=loud")).unwrap_err();
        assert!(matches!(err, ClientError::Telemetry(_)));
    }
}
