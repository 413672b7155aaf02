//! Stowage demo entry point.
//!
//! Runs the client flows against an in-memory row store: warm every
//! reference list, create a container in a room, and open its detail.

use futures_util::future::join_all;
use serde_json::json;
use std::sync::Arc;
use stowage_client::config::ClientConfig;
use stowage_client::error::ClientError;
use stowage_client::telemetry::init_tracing;
use stowage_client::{CreateFlow, DetailLoader, ReferenceLists};
use stowage_core::{
    DestinationType, EntityTable, Fields, ResourceKind, Table, TenantId, TransitionPayload,
};
use stowage_storage::{InMemoryRowStore, RowStore};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let config = ClientConfig::load()?;
    init_tracing(&config.telemetry)?;

    let memory = Arc::new(InMemoryRowStore::new());
    let attic = seed_household(&memory, config.tenant_id)?;
    let store: Arc<dyn RowStore> = memory;

    let lists = Arc::new(ReferenceLists::new(
        Arc::clone(&store),
        Some(config.tenant_id),
        &config.cache,
    ));
    let _rooms = lists.subscribe(
        ResourceKind::Rooms,
        lists.include_deleted_by_default(),
        |rows, error| match error {
            Some(e) => tracing::warn!(error = %e, "Room list failed"),
            None => tracing::info!(rooms = rows.len(), "Room list updated"),
        },
    );
    join_all(ResourceKind::ALL.map(|kind| lists.load_default(kind))).await;

    let flow = CreateFlow::new(Arc::clone(&store), Arc::clone(&lists));
    let toolbox = flow
        .create(
            EntityTable::Containers,
            fields(json!({"name": "Toolbox", "tenant_id": config.tenant_id.get()})),
            Some(TransitionPayload {
                destination_type: DestinationType::Room,
                destination_id: attic,
                tenant_id: config.tenant_id,
            }),
        )
        .await?;

    let detail = DetailLoader::new(store);
    let outcome = detail.load(Table::Containers, toolbox.id).await;
    let state = detail.state();
    tracing::info!(
        outcome = ?outcome,
        name = state.row.as_ref().and_then(|row| row.name()),
        metrics = ?flow.metrics(),
        "Demo finished"
    );
    Ok(())
}

fn fields(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Fields::new(),
    }
}

fn seed_household(
    store: &InMemoryRowStore,
    tenant_id: TenantId,
) -> Result<stowage_core::RowId, ClientError> {
    let tenant = tenant_id.get();
    store.seed(Table::Buildings, fields(json!({"name": "Main house", "tenant_id": tenant})))?;
    let attic = store.seed(Table::Rooms, fields(json!({"name": "Attic", "tenant_id": tenant})))?;
    store.seed(Table::Rooms, fields(json!({"name": "Garage", "tenant_id": tenant})))?;
    store.seed(Table::Furniture, fields(json!({"name": "Workbench", "tenant_id": tenant})))?;
    Ok(attic.id)
}
