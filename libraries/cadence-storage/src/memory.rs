//! In-memory record store
//!
//! Keeps rows per table behind a `RwLock`. Used by tests and the demo
//! binary; `set_offline` simulates a collaborator outage.

use async_trait::async_trait;
use cadence_core::{
    error::{CadenceError, Result},
    query::{Filter, Row, Table},
    RecordStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Record store held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    offline: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a store error (or recover)
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of rows currently stored in `table`
    pub async fn len(&self, table: Table) -> usize {
        self.tables.read().await.get(&table).map_or(0, Vec::len)
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CadenceError::store("Failed to fetch"))
        } else {
            Ok(())
        }
    }

    fn key(table: Table, row: &Row) -> Result<Vec<serde_json::Value>> {
        table.key_of(row).ok_or_else(|| {
            CadenceError::invalid_input(format!("row for {} is missing key", table.as_str()))
        })
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn find(&self, table: Table, filter: &Filter) -> Result<Vec<Row>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let rows = tables.get(&table).map(Vec::as_slice).unwrap_or_default();
        Ok(filter.apply(rows))
    }

    async fn insert(&self, table: Table, row: Row) -> Result<()> {
        self.check_online()?;
        let key = Self::key(table, &row)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();

        if rows.iter().any(|r| table.key_of(r).as_ref() == Some(&key)) {
            return Err(CadenceError::Duplicate(format!(
                "duplicate key value violates unique constraint on {}",
                table.as_str()
            )));
        }

        debug!(table = table.as_str(), "Inserting row");
        rows.push(row);
        Ok(())
    }

    async fn upsert(&self, table: Table, row: Row) -> Result<()> {
        self.check_online()?;
        let key = Self::key(table, &row)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table).or_default();

        match rows
            .iter_mut()
            .find(|r| table.key_of(r).as_ref() == Some(&key))
        {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<usize> {
        self.check_online()?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table) else {
            return Ok(0);
        };

        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        let removed = before - rows.len();

        debug!(table = table.as_str(), removed, "Deleted rows");
        Ok(removed)
    }
}
