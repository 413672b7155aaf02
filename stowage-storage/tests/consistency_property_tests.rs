use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stowage_core::{RowFilter, Table, TransitionRecord};
use stowage_storage::{create_with_transition, InMemoryRowStore, ListCache, RowStore};
use stowage_test_utils::fixtures;
use stowage_test_utils::generators::{arb_entity_table, arb_tenant_id, arb_transition_payload};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After a create attempt, the entity exists exactly when its transition
    /// exists, unless the compensating delete itself failed.
    #[test]
    fn saga_leaves_entity_and_transition_together(
        table in arb_entity_table(),
        payload in proptest::option::of(arb_transition_payload()),
        fail_entity in any::<bool>(),
        fail_transition in any::<bool>(),
        fail_delete in any::<bool>(),
    ) {
        let store = InMemoryRowStore::new();
        if fail_entity {
            store.fail_next_insert(table.table(), "entity rejected");
        }
        if fail_transition {
            store.fail_next_insert(Table::Transitions, "fk violation");
        }
        if fail_delete {
            store.fail_next_delete(table.table(), "connection reset");
        }
        let with_payload = payload.is_some();

        let result = runtime().block_on(create_with_transition(
            &store,
            table,
            fixtures::named("Lamp"),
            payload,
        ));

        let entities = store.count(table.table()).unwrap();
        let transitions = store.rows(Table::Transitions).unwrap();
        match (&result, fail_entity, with_payload, fail_transition) {
            (Err(e), true, _, _) => {
                prop_assert!(e.to_string().contains("entity rejected"));
                prop_assert_eq!(entities, 0);
                prop_assert!(transitions.is_empty());
            }
            (Ok(row), false, false, _) => {
                prop_assert_eq!(entities, 1);
                prop_assert!(transitions.is_empty());
                prop_assert_eq!(row.table, table.table());
            }
            (Ok(row), false, true, false) => {
                prop_assert_eq!(entities, 1);
                prop_assert_eq!(transitions.len(), 1);
                let record = TransitionRecord::from_row(&transitions[0]).unwrap();
                prop_assert_eq!(record.entity_table, table);
                prop_assert_eq!(record.entity_id, row.id);
                if let Some(payload) = &payload {
                    prop_assert_eq!(record.destination_type, payload.destination_type);
                    prop_assert_eq!(record.destination_id, payload.destination_id);
                    prop_assert_eq!(record.tenant_id, payload.tenant_id);
                }
            }
            (Err(e), false, true, true) => {
                prop_assert!(e.to_string().contains("fk violation"));
                prop_assert!(transitions.is_empty());
                prop_assert_eq!(entities, usize::from(fail_delete));
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
    }

    /// A tenant-scoped select returns only that tenant's rows, and hides
    /// soft-deleted ones unless asked.
    #[test]
    fn select_is_scoped_to_tenant(
        tenant in arb_tenant_id(),
        names in prop::collection::vec("[A-Z][a-z]{2,8}", 0..6),
        include_deleted in any::<bool>(),
    ) {
        let store = InMemoryRowStore::new();
        for (i, name) in names.iter().enumerate() {
            let mut data = fixtures::named(name);
            data.insert("tenant_id".to_string(), (tenant.get() + (i % 2) as i64).into());
            let row = store.seed(Table::Rooms, data).unwrap();
            if i % 3 == 0 {
                store.soft_delete(Table::Rooms, row.id).unwrap();
            }
        }
        let filter = RowFilter { tenant_id: Some(tenant), include_deleted };

        let rows = runtime().block_on(store.select(Table::Rooms, filter)).unwrap();

        let expected = (0..names.len())
            .filter(|i| i % 2 == 0 && (include_deleted || i % 3 != 0))
            .count();
        prop_assert_eq!(rows.len(), expected);
        prop_assert!(rows.iter().all(|row| row.tenant_id() == Some(tenant)));
        prop_assert!(include_deleted || rows.iter().all(|row| !row.is_deleted()));
    }

    /// However many loads race for one key, the fetch runs once and every
    /// caller observes the same entry.
    #[test]
    fn cache_runs_one_fetch_per_burst(callers in 1usize..16) {
        let cache: ListCache<u32> = ListCache::new("prop");
        let calls = Arc::new(AtomicUsize::new(0));

        runtime().block_on(async {
            let loads: Vec<_> = (0..callers)
                .map(|i| {
                    let calls = Arc::clone(&calls);
                    cache.load("k", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok(vec![i as u32])
                    })
                })
                .collect();
            futures_util::future::join_all(loads).await;
        });

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        let entry = cache.get("k").unwrap();
        prop_assert_eq!(&entry.data[..], &[0u32][..]);
        prop_assert_eq!(cache.stats().deduplicated_loads, (callers - 1) as u64);
    }

    /// Invalidations issued while a fetch is in flight always discard it.
    #[test]
    fn cache_drops_results_from_older_generations(invalidations in 1usize..5) {
        let cache: ListCache<u32> = ListCache::new("prop");
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        runtime().block_on(async {
            let stale = cache.load("k", move || async move {
                let _ = gate.await;
                Ok(vec![1])
            });
            let driver = async {
                tokio::task::yield_now().await;
                for _ in 0..invalidations {
                    cache.invalidate("k");
                }
                let _ = release.send(());
            };
            tokio::join!(stale, driver);
        });

        prop_assert!(cache.get("k").is_none());
        prop_assert_eq!(cache.generation("k").get(), invalidations as u64);
        prop_assert_eq!(cache.stats().stale_discards, 1);
    }
}
