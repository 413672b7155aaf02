//! Reference lists backing the pickers (rooms, places, containers, furniture,
//! buildings).
//!
//! One [`ListCache`] per resource kind, built once at start-up. Keys are
//! `"{kind}:{include_deleted}"`, so live-only and all-rows lists of the same
//! kind are cached and invalidated independently of each other's fetches.

use std::sync::Arc;
use stowage_core::{EntityRow, ResourceKind, RowFilter, StoreError, TenantId};
use stowage_storage::{CacheEntry, CacheStats, ListCache, PendingLoad, RowStore, Subscription};

use crate::config::CacheConfig;

/// Cache key for a reference list.
pub fn list_key(kind: ResourceKind, include_deleted: bool) -> String {
    format!("{}:{}", kind, include_deleted)
}

fn slot(kind: ResourceKind) -> usize {
    match kind {
        ResourceKind::Rooms => 0,
        ResourceKind::Places => 1,
        ResourceKind::Containers => 2,
        ResourceKind::Furniture => 3,
        ResourceKind::Buildings => 4,
    }
}

pub struct ReferenceLists {
    store: Arc<dyn RowStore>,
    tenant_id: Option<TenantId>,
    include_deleted_by_default: bool,
    caches: [ListCache<EntityRow>; 5],
}

impl ReferenceLists {
    pub fn new(store: Arc<dyn RowStore>, tenant_id: Option<TenantId>, config: &CacheConfig) -> Self {
        let caches = ResourceKind::ALL.map(|kind| ListCache::new(format!("{}{}", config.name_prefix, kind)));
        Self {
            store,
            tenant_id,
            include_deleted_by_default: config.include_deleted_by_default,
            caches,
        }
    }

    pub fn include_deleted_by_default(&self) -> bool {
        self.include_deleted_by_default
    }

    /// The cache serving `kind`.
    pub fn cache(&self, kind: ResourceKind) -> &ListCache<EntityRow> {
        &self.caches[slot(kind)]
    }

    pub fn get(&self, kind: ResourceKind, include_deleted: bool) -> Option<CacheEntry<EntityRow>> {
        self.cache(kind).get(&list_key(kind, include_deleted))
    }

    pub fn subscribe<F>(&self, kind: ResourceKind, include_deleted: bool, callback: F) -> Subscription
    where
        F: Fn(&[EntityRow], Option<&StoreError>) + Send + Sync + 'static,
    {
        self.cache(kind)
            .subscribe(list_key(kind, include_deleted), callback)
    }

    /// Load the list for `kind` from the row store, sharing any fetch already
    /// in flight.
    pub fn load(&self, kind: ResourceKind, include_deleted: bool) -> PendingLoad {
        let store = Arc::clone(&self.store);
        let filter = RowFilter {
            tenant_id: self.tenant_id,
            include_deleted,
        };
        self.cache(kind)
            .load(list_key(kind, include_deleted), move || async move {
                store.select(kind.table(), filter).await
            })
    }

    /// Load with the configured `include_deleted` default.
    pub fn load_default(&self, kind: ResourceKind) -> PendingLoad {
        self.load(kind, self.include_deleted_by_default)
    }

    /// Invalidate both variants of the `kind` list.
    pub fn invalidate(&self, kind: ResourceKind) {
        let cache = self.cache(kind);
        cache.invalidate(&list_key(kind, false));
        cache.invalidate(&list_key(kind, true));
    }

    /// Invalidate every list, e.g. on tenant switch.
    pub fn invalidate_all(&self) {
        for cache in &self.caches {
            cache.invalidate_all();
        }
    }

    pub fn stats(&self, kind: ResourceKind) -> CacheStats {
        self.cache(kind).stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use stowage_core::Table;
    use stowage_storage::{InMemoryRowStore, StoreOp};
    use stowage_test_utils::{assertions, fixtures, GatedRowStore};

    fn config() -> CacheConfig {
        CacheConfig {
            include_deleted_by_default: false,
            name_prefix: "test.".to_string(),
        }
    }

    fn lists(store: Arc<dyn RowStore>) -> ReferenceLists {
        ReferenceLists::new(store, Some(fixtures::TENANT), &config())
    }

    #[test]
    fn test_list_key_format() {
        assert_eq!(list_key(ResourceKind::Rooms, false), "rooms:false");
        assert_eq!(list_key(ResourceKind::Furniture, true), "furniture:true");
    }

    #[test]
    fn test_cache_names_use_prefix() {
        let lists = lists(Arc::new(InMemoryRowStore::new()));
        assert_eq!(lists.cache(ResourceKind::Places).name(), "test.places");
    }

    #[tokio::test]
    async fn test_keys_are_scoped_by_include_deleted() {
        let store = Arc::new(InMemoryRowStore::new());
        fixtures::household(&store);
        let lists = lists(store.clone());

        lists.load(ResourceKind::Rooms, false).await;
        lists.load(ResourceKind::Rooms, true).await;

        let live = lists.get(ResourceKind::Rooms, false).unwrap();
        assertions::assert_names(&live.data, &["Attic", "Garage"]);
        let all = lists.get(ResourceKind::Rooms, true).unwrap();
        assertions::assert_names(&all.data, &["Attic", "Garage", "Shed"]);
        assert_eq!(store.call_count(StoreOp::Select, Table::Rooms), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_issue_one_select() {
        let store = Arc::new(InMemoryRowStore::new());
        fixtures::household(&store);
        let lists = lists(store.clone());

        tokio::join!(
            lists.load(ResourceKind::Containers, false),
            lists.load(ResourceKind::Containers, false),
            lists.load(ResourceKind::Containers, false),
        );

        assert_eq!(store.call_count(StoreOp::Select, Table::Containers), 1);
        assert_eq!(lists.stats(ResourceKind::Containers).deduplicated_loads, 2);
    }

    #[tokio::test]
    async fn test_select_failure_reaches_subscribers() {
        let store = Arc::new(InMemoryRowStore::new());
        store.fail_next_select(Table::Buildings, "permission denied");
        let lists = lists(store.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = lists.subscribe(ResourceKind::Buildings, false, move |rows, error| {
            sink.lock().unwrap().push((rows.len(), error.cloned()));
        });

        lists.load_default(ResourceKind::Buildings).await;

        let entry = lists.get(ResourceKind::Buildings, false).unwrap();
        assert!(entry.is_error());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            (
                0,
                Some(StoreError::QueryFailed {
                    table: Table::Buildings,
                    reason: "permission denied".to_string()
                })
            )
        );
    }

    #[tokio::test]
    async fn test_invalidate_during_select_drops_old_list() {
        let inner = Arc::new(InMemoryRowStore::new());
        fixtures::household(&inner);
        let gated = GatedRowStore::new(inner.clone());
        let lists = lists(Arc::new(gated.clone()));
        let gate = gated.gate_select(Table::Rooms);

        let stale = lists.load(ResourceKind::Rooms, false);
        let writer = async {
            tokio::task::yield_now().await;
            inner.seed(Table::Rooms, fixtures::named("Loft")).unwrap();
            lists.invalidate(ResourceKind::Rooms);
            gate.release();
        };
        tokio::join!(stale, writer);

        assert!(lists.get(ResourceKind::Rooms, false).is_none());
        lists.load(ResourceKind::Rooms, false).await;
        let fresh = lists.get(ResourceKind::Rooms, false).unwrap();
        assertions::assert_names(&fresh.data, &["Attic", "Garage", "Loft"]);
    }

    #[tokio::test]
    async fn test_invalidate_all_clears_every_kind() {
        let store = Arc::new(InMemoryRowStore::new());
        fixtures::household(&store);
        let lists = lists(store);
        for kind in ResourceKind::ALL {
            lists.load_default(kind).await;
        }

        lists.invalidate_all();

        for kind in ResourceKind::ALL {
            assert!(lists.get(kind, false).is_none());
        }
    }
}
