//! Error types for the client.

use crate::config::ConfigError;
use stowage_core::{StoreError, StowageError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),
    #[error(transparent)]
    Stowage(#[from] StowageError),
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::Stowage(StowageError::from(err))
    }
}
