//! Stowage Storage - Row Store Trait, Saga, and List Cache
//!
//! Defines the row-level persistence abstraction for Stowage, the
//! create-with-location saga built on it, and the read-through cache used for
//! reference lists. The hosted database adapter lives outside this crate;
//! [`InMemoryRowStore`] stands in for it in tests and local runs.

pub mod cache;
pub mod memory;
pub mod row_store;
pub mod saga;

pub use cache::{
    CacheEntry, CacheStats, FetchResult, Generation, ListCache, PendingLoad, Subscription,
};
pub use memory::{InMemoryRowStore, StoreCall, StoreOp};
pub use row_store::RowStore;
pub use saga::{
    create_with_transition, CreateWithTransition, SagaMetrics, SagaMetricsSnapshot,
};
