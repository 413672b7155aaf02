//! Stowage Core - Row Types
//!
//! Plain data structures shared by every Stowage crate: row identities, the
//! table/destination enums, transition records, and the error taxonomy.
//! This crate contains no I/O.

pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use entities::{EntityRow, Fields, RowFilter, TransitionPayload, TransitionRecord};
pub use enums::{DestinationType, EntityTable, ParseEnumError, ResourceKind, Table};
pub use error::{
    ConfigError, StoreError, StoreResult, StowageError, StowageResult, ValidationError,
};
pub use identity::{RowId, TenantId, Timestamp};
