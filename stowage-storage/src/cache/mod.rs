//! Reference list cache.
//!
//! Pickers and detail forms show short lists of rooms, places, containers,
//! furniture, and buildings. [`ListCache`] keeps those lists in memory, shares
//! one fetch between concurrent loaders, and drops results that arrive after
//! their key was invalidated.
//!
//! # Example
//!
//! ```ignore
//! let rooms: ListCache<EntityRow> = ListCache::new("rooms");
//! let _sub = rooms.subscribe("rooms:false", |rows, error| render(rows, error));
//! rooms.load("rooms:false", move || async move {
//!     store.select(Table::Rooms, RowFilter::default()).await
//! }).await;
//! ```

pub mod generation;
pub mod list_cache;
pub mod stats;

pub use generation::Generation;
pub use list_cache::{CacheEntry, FetchResult, ListCache, PendingLoad, Subscription};
pub use stats::CacheStats;
