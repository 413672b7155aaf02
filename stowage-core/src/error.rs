//! Error types for Stowage operations

use crate::{RowId, Table};
use thiserror::Error;

/// Row store errors.
///
/// Values are `Clone` so one failed fetch can be stored in a cache entry and
/// handed to every subscriber of that entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Row not found: {table} with id {id}")]
    NotFound { table: Table, id: RowId },

    #[error("Insert failed for {table}: {reason}")]
    InsertFailed { table: Table, reason: String },

    #[error("Delete failed for {table} with id {id}: {reason}")]
    DeleteFailed {
        table: Table,
        id: RowId,
        reason: String,
    },

    #[error("Query failed for {table}: {reason}")]
    QueryFailed { table: Table, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Stowage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StowageError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Stowage operations.
pub type StowageResult<T> = Result<T, StowageError>;

/// Result type alias for row store primitives.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
