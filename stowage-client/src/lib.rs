//! Stowage client library exports.

pub mod config;
pub mod create;
pub mod detail;
pub mod error;
pub mod ordering;
pub mod reference;
pub mod telemetry;

pub use create::CreateFlow;
pub use detail::{DetailKey, DetailLoader, DetailState, LoadOutcome};
pub use error::ClientError;
pub use ordering::{RequestGuard, RequestTicket};
pub use reference::{list_key, ReferenceLists};
