//! Create-form action: run the saga, then refresh the affected picker list.

use std::sync::Arc;
use stowage_core::{EntityRow, EntityTable, Fields, ResourceKind, StoreResult, TransitionPayload};
use stowage_storage::{CreateWithTransition, RowStore, SagaMetricsSnapshot};

use crate::reference::ReferenceLists;

pub struct CreateFlow {
    saga: CreateWithTransition,
    lists: Arc<ReferenceLists>,
}

impl CreateFlow {
    pub fn new(store: Arc<dyn RowStore>, lists: Arc<ReferenceLists>) -> Self {
        Self {
            saga: CreateWithTransition::new(store),
            lists,
        }
    }

    pub fn metrics(&self) -> SagaMetricsSnapshot {
        self.saga.metrics().snapshot()
    }

    /// Create an entity with an optional initial location.
    ///
    /// On success the reference list for the entity's table (if it has one)
    /// is invalidated and reloaded before returning. On failure nothing is
    /// refreshed.
    pub async fn create(
        &self,
        table: EntityTable,
        insert_data: Fields,
        transition: Option<TransitionPayload>,
    ) -> StoreResult<EntityRow> {
        let row = self.saga.run(table, insert_data, transition).await?;

        if let Some(kind) = ResourceKind::for_table(table.table()) {
            self.lists.invalidate(kind);
            self.lists.load_default(kind).await;
            tracing::debug!(kind = %kind, row_id = %row.id, "Reference list refreshed after create");
        }
        Ok(row)
    }
}
