//! Stowage Test Utilities
//!
//! Shared test infrastructure for the Stowage workspace:
//! - Proptest generators for rows, payloads, and enums
//! - A gated row store for driving request interleavings
//! - Fixtures for a small seeded household
//! - Custom assertions for store errors

pub use stowage_storage::{InMemoryRowStore, RowStore, StoreCall, StoreOp};

pub use stowage_core::{
    DestinationType, EntityRow, EntityTable, Fields, ResourceKind, RowFilter, RowId, StoreError,
    StoreResult, Table, TenantId, Timestamp, TransitionPayload,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

// ============================================================================
// GATED STORE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GateKey {
    Get(Table, RowId),
    Select(Table),
}

/// Release handle for one gated call. Dropping it also releases the call.
#[derive(Debug)]
pub struct Gate {
    release: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Row store wrapper that can hold individual reads until the test releases
/// them, so responses can be made to arrive in any order.
///
/// Each gate applies to the next matching call only.
#[derive(Debug, Clone)]
pub struct GatedRowStore {
    inner: Arc<InMemoryRowStore>,
    gates: Arc<Mutex<HashMap<GateKey, oneshot::Receiver<()>>>>,
}

impl GatedRowStore {
    pub fn new(inner: Arc<InMemoryRowStore>) -> Self {
        Self {
            inner,
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn inner(&self) -> &Arc<InMemoryRowStore> {
        &self.inner
    }

    /// Hold the next `get(table, id)` until the returned gate is released.
    pub fn gate_get(&self, table: Table, id: RowId) -> Gate {
        self.install(GateKey::Get(table, id))
    }

    /// Hold the next `select(table, ..)` until the returned gate is released.
    pub fn gate_select(&self, table: Table) -> Gate {
        self.install(GateKey::Select(table))
    }

    fn install(&self, key: GateKey) -> Gate {
        let (release, wait) = oneshot::channel();
        self.gates
            .lock()
            .expect("gate map poisoned")
            .insert(key, wait);
        Gate { release }
    }

    async fn pass(&self, key: GateKey) {
        let wait = self.gates.lock().expect("gate map poisoned").remove(&key);
        if let Some(wait) = wait {
            // A dropped gate counts as released.
            let _ = wait.await;
        }
    }
}

#[async_trait]
impl RowStore for GatedRowStore {
    async fn insert(&self, table: Table, fields: Fields) -> StoreResult<EntityRow> {
        self.inner.insert(table, fields).await
    }

    async fn delete(&self, table: Table, id: RowId) -> StoreResult<()> {
        self.inner.delete(table, id).await
    }

    async fn get(&self, table: Table, id: RowId) -> StoreResult<Option<EntityRow>> {
        self.pass(GateKey::Get(table, id)).await;
        self.inner.get(table, id).await
    }

    async fn select(&self, table: Table, filter: RowFilter) -> StoreResult<Vec<EntityRow>> {
        self.pass(GateKey::Select(table)).await;
        self.inner.select(table, filter).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Stowage values.

    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    /// Generate a valid (positive) RowId.
    pub fn arb_row_id() -> impl Strategy<Value = RowId> {
        (1i64..1_000_000).prop_filter_map("positive id", RowId::new)
    }

    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        (1i64..100).prop_map(TenantId)
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_entity_table() -> impl Strategy<Value = EntityTable> {
        prop_oneof![
            Just(EntityTable::Places),
            Just(EntityTable::Containers),
            Just(EntityTable::Items),
        ]
    }

    pub fn arb_destination_type() -> impl Strategy<Value = DestinationType> {
        prop_oneof![
            Just(DestinationType::Room),
            Just(DestinationType::Place),
            Just(DestinationType::Container),
            Just(DestinationType::Furniture),
        ]
    }

    pub fn arb_resource_kind() -> impl Strategy<Value = ResourceKind> {
        prop::sample::select(ResourceKind::ALL.to_vec())
    }

    /// Generate a display name such as a room or item label.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,12}( [a-z]{2,8})?"
    }

    /// Generate insert data with a name and tenant.
    pub fn arb_fields() -> impl Strategy<Value = Fields> {
        (arb_name(), arb_tenant_id()).prop_map(|(name, tenant)| {
            let mut fields = Fields::new();
            fields.insert("name".to_string(), serde_json::Value::from(name));
            fields.insert("tenant_id".to_string(), serde_json::Value::from(tenant.get()));
            fields
        })
    }

    pub fn arb_transition_payload() -> impl Strategy<Value = TransitionPayload> {
        (arb_destination_type(), arb_row_id(), arb_tenant_id()).prop_map(
            |(destination_type, destination_id, tenant_id)| TransitionPayload {
                destination_type,
                destination_id,
                tenant_id,
            },
        )
    }

    /// Generate a persisted row of `table`, live or soft-deleted.
    pub fn arb_entity_row(table: Table) -> impl Strategy<Value = EntityRow> {
        (
            arb_row_id(),
            arb_fields(),
            arb_timestamp(),
            proptest::option::of(arb_timestamp()),
        )
            .prop_map(move |(id, fields, created_at, deleted_at)| EntityRow {
                id,
                table,
                fields,
                created_at,
                deleted_at,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;

    /// Tenant used by every fixture row.
    pub const TENANT: TenantId = TenantId(1);

    /// Build a field map from `(column, value)` pairs.
    pub fn fields<I, K, V>(pairs: I) -> Fields
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }

    /// Insert data for a named row owned by [`TENANT`].
    pub fn named(name: &str) -> Fields {
        fields([
            ("name", serde_json::Value::from(name)),
            ("tenant_id", serde_json::Value::from(TENANT.get())),
        ])
    }

    /// Rows seeded by [`household`].
    #[derive(Debug, Clone)]
    pub struct Household {
        pub building: EntityRow,
        pub attic: EntityRow,
        pub garage: EntityRow,
        /// Soft-deleted room.
        pub shed: EntityRow,
        pub shelf: EntityRow,
        pub toolbox: EntityRow,
        pub workbench: EntityRow,
        pub lamp: EntityRow,
    }

    /// Seed a small household into `store`.
    pub fn household(store: &InMemoryRowStore) -> Household {
        let seed = |table: Table, name: &str| {
            store
                .seed(table, named(name))
                .expect("seeding the in-memory store")
        };
        let building = seed(Table::Buildings, "Main house");
        let attic = seed(Table::Rooms, "Attic");
        let garage = seed(Table::Rooms, "Garage");
        let shed = seed(Table::Rooms, "Shed");
        store
            .soft_delete(Table::Rooms, shed.id)
            .expect("soft-deleting fixture room");
        let shelf = seed(Table::Places, "Top shelf");
        let toolbox = seed(Table::Containers, "Toolbox");
        let workbench = seed(Table::Furniture, "Workbench");
        let lamp = seed(Table::Items, "Lamp");
        Household {
            building,
            attic,
            garage,
            shed,
            shelf,
            toolbox,
            workbench,
            lamp,
        }
    }

    /// Transition payload pointing at `destination`.
    pub fn payload_to(destination_type: DestinationType, destination: &EntityRow) -> TransitionPayload {
        TransitionPayload {
            destination_type,
            destination_id: destination.id,
            tenant_id: TENANT,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for Stowage-specific results.

    use super::*;

    /// Assert that a result failed with `InsertFailed` on `table` for `reason`.
    #[track_caller]
    pub fn assert_insert_failed<T: std::fmt::Debug>(
        result: &StoreResult<T>,
        table: Table,
        reason: &str,
    ) {
        match result {
            Err(StoreError::InsertFailed { table: t, reason: r }) => {
                assert_eq!(*t, table, "Wrong table in InsertFailed error");
                assert_eq!(r, reason, "Wrong reason in InsertFailed error");
            }
            other => panic!("Expected InsertFailed on {}, got: {:?}", table, other),
        }
    }

    /// Assert the names of `rows`, in order.
    #[track_caller]
    pub fn assert_names(rows: &[EntityRow], expected: &[&str]) {
        let names: Vec<&str> = rows.iter().filter_map(EntityRow::name).collect();
        assert_eq!(names, expected);
    }
}

// ============================================================================
// TESTS
// ============================================================================
