//! # In-Memory Status Store
//!
//! Thread-safe in-memory implementation for testing and development.
//! Keeps an ordered log of every status write alongside the records.

use crate::codec::StoredRecord;
use crate::status_store::{validate_table_name, StatusStore, StatusStoreError, StatusWrite};
use crate::{RecordStatus, Timestamp};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

type Tables = HashMap<String, HashMap<String, StoredRecord>>;

/// Thread-safe in-memory status store
///
/// Uses RwLock for concurrent access with minimal contention. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStatusStore {
    tables: Arc<RwLock<Tables>>,
    writes: Arc<RwLock<Vec<StatusWrite>>>,
}

impl InMemoryStatusStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// All status writes in the order they happened
    pub fn status_writes(&self) -> Vec<StatusWrite> {
        self.writes
            .read()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Status writes for one id, in order
    pub fn status_writes_for(&self, id: &str) -> Vec<StatusWrite> {
        self.status_writes()
            .into_iter()
            .filter(|w| w.id == id)
            .collect()
    }

    /// Number of records held in a table
    pub fn record_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    fn poisoned() -> StatusStoreError {
        StatusStoreError::Internal {
            message: "in-memory store lock poisoned".to_string(),
        }
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn put(&self, table: &str, record: &StoredRecord) -> Result<(), StatusStoreError> {
        validate_table_name(table)?;
        let id = record
            .id()
            .ok_or_else(|| StatusStoreError::MissingKey { id: String::new() })?
            .to_string();

        let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        table: &str,
        id: &str,
        status: RecordStatus,
    ) -> Result<(), StatusStoreError> {
        validate_table_name(table)?;

        {
            let mut tables = self.tables.write().map_err(|_| Self::poisoned())?;
            tables
                .entry(table.to_string())
                .or_default()
                .entry(id.to_string())
                .and_modify(|record| record.set_status(status))
                .or_insert_with(|| StoredRecord::status_only(id, status));
        } // Lock dropped here

        self.writes
            .write()
            .map_err(|_| Self::poisoned())?
            .push(StatusWrite {
                table: table.to_string(),
                id: id.to_string(),
                status,
                written_at: Timestamp::now(),
            });
        Ok(())
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<StoredRecord>, StatusStoreError> {
        validate_table_name(table)?;
        let tables = self.tables.read().map_err(|_| Self::poisoned())?;
        Ok(tables.get(table).and_then(|t| t.get(id)).cloned())
    }
}

#[cfg(test)]
#[path = "memory_status_store_tests.rs"]
mod tests;
