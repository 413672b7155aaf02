//! Async row store trait.
//!
//! The hosted database is reached through these primitives only. Each call is
//! an independent round trip; there is no cross-call transaction.

use ::async_trait::async_trait;
use std::sync::Arc;
use stowage_core::{EntityRow, Fields, RowFilter, RowId, StoreResult, Table};

/// Row-level persistence primitives consumed by the saga and the list loaders.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Insert a row into `table` and return it with its assigned id.
    async fn insert(&self, table: Table, fields: Fields) -> StoreResult<EntityRow>;

    /// Hard-delete a row.
    async fn delete(&self, table: Table, id: RowId) -> StoreResult<()>;

    /// Fetch one row by id, including soft-deleted rows.
    async fn get(&self, table: Table, id: RowId) -> StoreResult<Option<EntityRow>>;

    /// Fetch every row of `table` matching `filter`, ordered by id.
    async fn select(&self, table: Table, filter: RowFilter) -> StoreResult<Vec<EntityRow>>;
}

#[async_trait]
impl<S: RowStore + ?Sized> RowStore for Arc<S> {
    async fn insert(&self, table: Table, fields: Fields) -> StoreResult<EntityRow> {
        (**self).insert(table, fields).await
    }

    async fn delete(&self, table: Table, id: RowId) -> StoreResult<()> {
        (**self).delete(table, id).await
    }

    async fn get(&self, table: Table, id: RowId) -> StoreResult<Option<EntityRow>> {
        (**self).get(table, id).await
    }

    async fn select(&self, table: Table, filter: RowFilter) -> StoreResult<Vec<EntityRow>> {
        (**self).select(table, filter).await
    }
}
