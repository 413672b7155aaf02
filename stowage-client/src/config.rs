//! Configuration loading for the Stowage client.
//!
//! All fields are required. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use stowage_core::TenantId;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub tenant_id: TenantId,
    pub telemetry: TelemetryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether reference lists include soft-deleted rows when a caller
    /// does not say.
    pub include_deleted_by_default: bool,
    /// Prefix for cache names in log fields (`"{prefix}rooms"`).
    pub name_prefix: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or STOWAGE_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] stowage_core::ConfigError),
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenant_id.get() <= 0 {
            return Err(invalid("tenant_id", self.tenant_id.to_string(), "must be > 0"));
        }
        if self.telemetry.log_filter.trim().is_empty() {
            return Err(invalid(
                "telemetry.log_filter",
                self.telemetry.log_filter.clone(),
                "must not be empty",
            ));
        }
        if self.cache.name_prefix.trim().is_empty() {
            return Err(invalid(
                "cache.name_prefix",
                self.cache.name_prefix.clone(),
                "must not be empty",
            ));
        }
        if self.cache.name_prefix.chars().any(char::is_whitespace) {
            return Err(invalid(
                "cache.name_prefix",
                self.cache.name_prefix.clone(),
                "must not contain whitespace",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: String, reason: &str) -> ConfigError {
    ConfigError::Invalid(stowage_core::ConfigError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("STOWAGE_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
