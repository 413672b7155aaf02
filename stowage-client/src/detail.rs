//! Entity detail loader.
//!
//! Navigating quickly between entities starts overlapping loads. Each load
//! runs under a [`RequestGuard`] ticket and only writes the shared
//! [`DetailState`] if it is still the latest request when the row arrives.

use std::sync::{Arc, Mutex, MutexGuard};
use stowage_core::{EntityRow, RowId, StoreError, Table};
use stowage_storage::RowStore;

use crate::ordering::RequestGuard;

/// Identifies the entity a detail pane shows.
pub type DetailKey = (Table, RowId);

/// What the detail pane currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub target: Option<DetailKey>,
    pub row: Option<EntityRow>,
    pub error: Option<StoreError>,
    pub loading: bool,
}

/// Result of one [`DetailLoader::load`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result was written to the detail state.
    Applied,
    /// A newer load started meanwhile; the result was dropped.
    Superseded,
    /// The same entity was already loading; nothing was started.
    AlreadyLoading,
}

#[derive(Clone)]
pub struct DetailLoader {
    store: Arc<dyn RowStore>,
    guard: RequestGuard<DetailKey>,
    state: Arc<Mutex<DetailState>>,
}

impl DetailLoader {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self {
            store,
            guard: RequestGuard::new(),
            state: Arc::new(Mutex::new(DetailState::default())),
        }
    }

    pub fn state(&self) -> DetailState {
        self.lock().clone()
    }

    pub fn guard(&self) -> &RequestGuard<DetailKey> {
        &self.guard
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Detail state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Load `id` from `table` into the detail state.
    pub async fn load(&self, table: Table, id: RowId) -> LoadOutcome {
        let key = (table, id);
        let Some(ticket) = self.guard.begin(key) else {
            return LoadOutcome::AlreadyLoading;
        };

        {
            let mut state = self.lock();
            state.target = Some(key);
            state.loading = true;
        }

        let result = self.store.get(table, id).await;

        if !ticket.is_latest() {
            tracing::debug!(table = %table, row_id = %id, "Discarding superseded detail load");
            ticket.finish();
            return LoadOutcome::Superseded;
        }

        {
            let mut state = self.lock();
            match result {
                Ok(Some(row)) => {
                    state.row = Some(row);
                    state.error = None;
                }
                Ok(None) => {
                    state.row = None;
                    state.error = Some(StoreError::NotFound { table, id });
                }
                Err(e) => {
                    tracing::warn!(table = %table, row_id = %id, error = %e, "Detail load failed");
                    state.row = None;
                    state.error = Some(e);
                }
            }
            state.loading = false;
        }
        ticket.finish();
        LoadOutcome::Applied
    }
}
