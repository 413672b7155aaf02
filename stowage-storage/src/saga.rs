//! Create-With-Location Saga
//!
//! Creates an entity row and its first transition record as two independent
//! row-store calls. If the transition insert fails, the entity row is deleted
//! again so the caller observes the whole operation as failed.
//!
//! Steps:
//!
//! 1. Insert the entity row. A failure here is returned as-is; nothing was
//!    written.
//! 2. Without a transition payload, return the inserted row.
//! 3. Insert the transition row, referencing the entity through the
//!    table-specific column (`item_id`, `place_id`, `container_id`).
//! 4. If step 3 fails, delete the entity row (best effort) and return the
//!    transition error unchanged. A failed compensating delete is logged and
//!    counted, never returned.
//!
//! No retries happen here. A crash between steps 1 and 3 leaves an orphaned
//! entity row with no transition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stowage_core::{EntityRow, EntityTable, Fields, StoreResult, Table, TransitionPayload};

use crate::row_store::RowStore;

// ============================================================================
// METRICS
// ============================================================================

/// Counters for saga outcomes since construction.
#[derive(Debug, Default)]
pub struct SagaMetrics {
    /// Entities created, with or without a transition.
    pub created: AtomicU64,

    /// Entity inserts that failed (step 1).
    pub insert_failures: AtomicU64,

    /// Entity rows deleted after a failed transition insert.
    pub compensated: AtomicU64,

    /// Compensating deletes that themselves failed (orphan left behind).
    pub compensation_failures: AtomicU64,
}

impl SagaMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all counters.
    pub fn snapshot(&self) -> SagaMetricsSnapshot {
        SagaMetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            insert_failures: self.insert_failures.load(Ordering::Relaxed),
            compensated: self.compensated.load(Ordering::Relaxed),
            compensation_failures: self.compensation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of saga metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SagaMetricsSnapshot {
    pub created: u64,
    pub insert_failures: u64,
    pub compensated: u64,
    pub compensation_failures: u64,
}

// ============================================================================
// SAGA
// ============================================================================

/// Saga runner bound to a row store, with metrics shared across runs.
#[derive(Clone)]
pub struct CreateWithTransition {
    store: Arc<dyn RowStore>,
    metrics: Arc<SagaMetrics>,
}

impl CreateWithTransition {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            metrics: Arc::new(SagaMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &SagaMetrics {
        &self.metrics
    }

    /// Run the saga once.
    pub async fn run(
        &self,
        table: EntityTable,
        insert_data: Fields,
        transition: Option<TransitionPayload>,
    ) -> StoreResult<EntityRow> {
        execute(
            self.store.as_ref(),
            &self.metrics,
            table,
            insert_data,
            transition,
        )
        .await
    }
}

/// Create an entity row and, if requested, its initial transition record.
///
/// See the module documentation for the step-by-step contract.
pub async fn create_with_transition<S>(
    store: &S,
    table: EntityTable,
    insert_data: Fields,
    transition: Option<TransitionPayload>,
) -> StoreResult<EntityRow>
where
    S: RowStore + ?Sized,
{
    execute(store, &SagaMetrics::default(), table, insert_data, transition).await
}

async fn execute<S>(
    store: &S,
    metrics: &SagaMetrics,
    table: EntityTable,
    insert_data: Fields,
    transition: Option<TransitionPayload>,
) -> StoreResult<EntityRow>
where
    S: RowStore + ?Sized,
{
    let row = match store.insert(table.table(), insert_data).await {
        Ok(row) => row,
        Err(e) => {
            metrics.insert_failures.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(error = %e, table = %table, "Entity insert failed");
            return Err(e);
        }
    };

    let Some(payload) = transition else {
        metrics.created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(table = %table, row_id = %row.id, "Entity created without transition");
        return Ok(row);
    };

    let transition_fields = payload.to_fields(table, row.id);
    match store.insert(Table::Transitions, transition_fields).await {
        Ok(transition_row) => {
            metrics.created.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                table = %table,
                row_id = %row.id,
                transition_id = %transition_row.id,
                destination_type = %payload.destination_type,
                destination_id = %payload.destination_id,
                "Entity created with initial transition"
            );
            Ok(row)
        }
        Err(transition_error) => {
            tracing::warn!(
                error = %transition_error,
                table = %table,
                row_id = %row.id,
                "Transition insert failed, deleting entity row"
            );
            match store.delete(table.table(), row.id).await {
                Ok(()) => {
                    metrics.compensated.fetch_add(1, Ordering::Relaxed);
                }
                Err(delete_error) => {
                    metrics
                        .compensation_failures
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        error = %delete_error,
                        table = %table,
                        row_id = %row.id,
                        "Compensating delete failed, entity row left without transition"
                    );
                }
            }
            Err(transition_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryRowStore, StoreCall, StoreOp};
    use serde_json::json;
    use stowage_core::{
        DestinationType, RowId, StoreError, TenantId, TransitionRecord,
    };

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    fn room_five() -> TransitionPayload {
        TransitionPayload {
            destination_type: DestinationType::Room,
            destination_id: RowId::new(5).unwrap(),
            tenant_id: TenantId(1),
        }
    }

    #[tokio::test]
    async fn test_creates_entity_and_matching_transition() {
        let store = InMemoryRowStore::new();
        let row = create_with_transition(
            &store,
            EntityTable::Containers,
            fields(json!({"name": "Toolbox"})),
            Some(room_five()),
        )
        .await
        .unwrap();

        assert_eq!(row.table, Table::Containers);
        let transitions = store.rows(Table::Transitions).unwrap();
        assert_eq!(transitions.len(), 1);
        let record = TransitionRecord::from_row(&transitions[0]).unwrap();
        assert_eq!(record.entity_table, EntityTable::Containers);
        assert_eq!(record.entity_id, row.id);
        assert_eq!(record.destination_type, DestinationType::Room);
        assert_eq!(record.destination_id.get(), 5);
    }

    #[tokio::test]
    async fn test_without_payload_creates_only_entity() {
        let store = InMemoryRowStore::new();
        create_with_transition(
            &store,
            EntityTable::Places,
            fields(json!({"name": "Top shelf"})),
            None,
        )
        .await
        .unwrap();

        assert_eq!(store.count(Table::Places).unwrap(), 1);
        assert_eq!(store.count(Table::Transitions).unwrap(), 0);
        assert_eq!(store.call_count(StoreOp::Insert, Table::Transitions), 0);
    }

    #[tokio::test]
    async fn test_entity_insert_failure_is_returned_verbatim() {
        let store = InMemoryRowStore::new();
        store.fail_next_insert(Table::Items, "name required");

        let err = create_with_transition(&store, EntityTable::Items, Fields::new(), Some(room_five()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::InsertFailed {
                table: Table::Items,
                reason: "name required".to_string()
            }
        );
        assert_eq!(store.call_count(StoreOp::Insert, Table::Transitions), 0);
        assert_eq!(store.call_count(StoreOp::Delete, Table::Items), 0);
    }

    #[tokio::test]
    async fn test_failed_transition_deletes_entity_and_keeps_error() {
        let store = InMemoryRowStore::new();
        store.fail_next_insert(Table::Transitions, "fk violation");

        let err = create_with_transition(
            &store,
            EntityTable::Items,
            fields(json!({"name": "Lamp"})),
            Some(room_five()),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            StoreError::InsertFailed {
                table: Table::Transitions,
                reason: "fk violation".to_string()
            }
        );
        assert_eq!(store.count(Table::Items).unwrap(), 0);
        assert_eq!(store.count(Table::Transitions).unwrap(), 0);

        let calls = store.calls();
        let inserted_id = calls[0].id;
        assert!(inserted_id.is_some());
        assert_eq!(
            calls,
            vec![
                StoreCall {
                    op: StoreOp::Insert,
                    table: Table::Items,
                    id: inserted_id
                },
                StoreCall {
                    op: StoreOp::Insert,
                    table: Table::Transitions,
                    id: None
                },
                StoreCall {
                    op: StoreOp::Delete,
                    table: Table::Items,
                    id: inserted_id
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_compensation_failure_is_swallowed() {
        let store = Arc::new(InMemoryRowStore::new());
        store.fail_next_insert(Table::Transitions, "fk violation");
        store.fail_next_delete(Table::Items, "connection reset");

        let saga = CreateWithTransition::new(store.clone());
        let err = saga
            .run(
                EntityTable::Items,
                fields(json!({"name": "Lamp"})),
                Some(room_five()),
            )
            .await
            .unwrap_err();

        // The transition error wins over the secondary delete error.
        assert!(err.to_string().contains("fk violation"));
        // Orphan left behind: the accepted gap of a non-transactional saga.
        assert_eq!(store.count(Table::Items).unwrap(), 1);
        assert_eq!(
            saga.metrics().snapshot(),
            SagaMetricsSnapshot {
                created: 0,
                insert_failures: 0,
                compensated: 0,
                compensation_failures: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_metrics_track_outcomes() {
        let store = Arc::new(InMemoryRowStore::new());
        let saga = CreateWithTransition::new(store.clone());

        saga.run(EntityTable::Items, Fields::new(), None).await.unwrap();
        saga.run(EntityTable::Items, Fields::new(), Some(room_five()))
            .await
            .unwrap();
        store.fail_next_insert(Table::Transitions, "fk violation");
        let _ = saga
            .run(EntityTable::Items, Fields::new(), Some(room_five()))
            .await;
        store.fail_next_insert(Table::Items, "duplicate");
        let _ = saga.run(EntityTable::Items, Fields::new(), None).await;

        let snapshot = saga.metrics().snapshot();
        assert_eq!(snapshot.created, 2);
        assert_eq!(snapshot.compensated, 1);
        assert_eq!(snapshot.insert_failures, 1);
        assert_eq!(snapshot.compensation_failures, 0);
    }
}
