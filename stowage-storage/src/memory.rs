//! In-memory row store for tests and local runs.

use ::async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, RwLock};
use stowage_core::{EntityRow, Fields, RowFilter, RowId, StoreError, StoreResult, Table};

use crate::row_store::RowStore;

/// Kind of primitive recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Insert,
    Delete,
    Get,
    Select,
}

/// One call made against the store, in arrival order.
///
/// `id` is the affected row, or `None` for failed inserts and selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub table: Table,
    pub id: Option<RowId>,
}

/// In-memory row store.
///
/// Ids are assigned from a single counter shared by all tables, starting at 1.
/// Failures can be queued per operation and table; each queued failure is
/// consumed by the next matching call.
#[derive(Debug, Default)]
pub struct InMemoryRowStore {
    tables: RwLock<HashMap<Table, BTreeMap<RowId, EntityRow>>>,
    last_id: AtomicI64,
    faults: Mutex<HashMap<(StoreOp, Table), VecDeque<String>>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl InMemoryRowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next insert into `table` fail with `reason`.
    pub fn fail_next_insert(&self, table: Table, reason: impl Into<String>) {
        self.push_fault(StoreOp::Insert, table, reason.into());
    }

    /// Make the next delete from `table` fail with `reason`.
    pub fn fail_next_delete(&self, table: Table, reason: impl Into<String>) {
        self.push_fault(StoreOp::Delete, table, reason.into());
    }

    /// Make the next select from `table` fail with `reason`.
    pub fn fail_next_select(&self, table: Table, reason: impl Into<String>) {
        self.push_fault(StoreOp::Select, table, reason.into());
    }

    /// Insert a row directly, bypassing fault injection and the call log.
    pub fn seed(&self, table: Table, fields: Fields) -> StoreResult<EntityRow> {
        let row = self.new_row(table, fields)?;
        self.tables
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .entry(table)
            .or_default()
            .insert(row.id, row.clone());
        Ok(row)
    }

    /// Mark a row as soft-deleted.
    pub fn soft_delete(&self, table: Table, id: RowId) -> StoreResult<()> {
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        let row = tables
            .get_mut(&table)
            .and_then(|rows| rows.get_mut(&id))
            .ok_or(StoreError::NotFound { table, id })?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    /// Every row of `table`, including soft-deleted ones.
    pub fn rows(&self, table: Table) -> StoreResult<Vec<EntityRow>> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Number of rows in `table`, including soft-deleted ones.
    pub fn count(&self, table: Table) -> StoreResult<usize> {
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.get(&table).map(BTreeMap::len).unwrap_or(0))
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls of `op` against `table`.
    pub fn call_count(&self, op: StoreOp, table: Table) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.op == op && call.table == table)
            .count()
    }

    /// Drop all rows, queued faults, and the call log.
    pub fn clear(&self) -> StoreResult<()> {
        self.tables
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        self.faults
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        self.calls
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        Ok(())
    }

    fn new_row(&self, table: Table, fields: Fields) -> StoreResult<EntityRow> {
        let raw = self.last_id.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let id = RowId::new(raw).ok_or_else(|| StoreError::InsertFailed {
            table,
            reason: "row id counter exhausted".to_string(),
        })?;
        Ok(EntityRow {
            id,
            table,
            fields,
            created_at: Utc::now(),
            deleted_at: None,
        })
    }

    fn push_fault(&self, op: StoreOp, table: Table, reason: String) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.entry((op, table)).or_default().push_back(reason);
        }
    }

    fn take_fault(&self, op: StoreOp, table: Table) -> StoreResult<Option<String>> {
        let mut faults = self.faults.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(faults.get_mut(&(op, table)).and_then(VecDeque::pop_front))
    }

    fn record(&self, op: StoreOp, table: Table, id: Option<RowId>) -> StoreResult<()> {
        self.calls
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(StoreCall { op, table, id });
        Ok(())
    }
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn insert(&self, table: Table, fields: Fields) -> StoreResult<EntityRow> {
        if let Some(reason) = self.take_fault(StoreOp::Insert, table)? {
            self.record(StoreOp::Insert, table, None)?;
            return Err(StoreError::InsertFailed { table, reason });
        }
        let row = self.seed(table, fields)?;
        self.record(StoreOp::Insert, table, Some(row.id))?;
        Ok(row)
    }

    async fn delete(&self, table: Table, id: RowId) -> StoreResult<()> {
        self.record(StoreOp::Delete, table, Some(id))?;
        if let Some(reason) = self.take_fault(StoreOp::Delete, table)? {
            return Err(StoreError::DeleteFailed { table, id, reason });
        }
        let mut tables = self.tables.write().map_err(|_| StoreError::LockPoisoned)?;
        tables
            .get_mut(&table)
            .and_then(|rows| rows.remove(&id))
            .map(|_| ())
            .ok_or(StoreError::NotFound { table, id })
    }

    async fn get(&self, table: Table, id: RowId) -> StoreResult<Option<EntityRow>> {
        self.record(StoreOp::Get, table, Some(id))?;
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.get(&table).and_then(|rows| rows.get(&id)).cloned())
    }

    async fn select(&self, table: Table, filter: RowFilter) -> StoreResult<Vec<EntityRow>> {
        self.record(StoreOp::Select, table, None)?;
        if let Some(reason) = self.take_fault(StoreOp::Select, table)? {
            return Err(StoreError::QueryFailed { table, reason });
        }
        let tables = self.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables
            .get(&table)
            .map(|rows| rows.values().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }
}
