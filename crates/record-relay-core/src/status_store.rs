//! # Status Store Interface
//!
//! Durable key-value store holding one record per tracked item.
//!
//! The store is treated as an external, independently consistent system: the
//! pipeline performs no locking of its own, and concurrent writes to the same id
//! resolve however the store resolves them (last write wins for the bundled
//! adapters).

use crate::codec::StoredRecord;
use crate::{RecordStatus, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by status store operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatusStoreError {
    #[error("Status store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Invalid table name '{table}': {message}")]
    InvalidTable { table: String, message: String },

    #[error("Record serialization failed: {message}")]
    Serialization { message: String },

    #[error("Record '{id}' has no usable key")]
    MissingKey { id: String },

    #[error("Internal status store error: {message}")]
    Internal { message: String },
}

impl StatusStoreError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Internal { .. })
    }
}

/// One status write observed by a store, for reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusWrite {
    pub table: String,
    pub id: String,
    pub status: RecordStatus,
    pub written_at: Timestamp,
}

/// Interface for the durable status store
///
/// # Examples
///
/// ```no_run
/// use record_relay_core::{InMemoryStatusStore, RecordStatus, StatusStore};
/// # async fn example() -> Result<(), record_relay_core::StatusStoreError> {
/// let store = InMemoryStatusStore::new();
/// store.update_status("events", "123", RecordStatus::Succeeded).await?;
///
/// let record = store.get("events", "123").await?;
/// assert_eq!(record.and_then(|r| r.status()), Some(RecordStatus::Succeeded));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Write a complete record, replacing any record with the same id
    ///
    /// # Errors
    ///
    /// Returns error if the record has no string `id` attribute or the store is
    /// unavailable.
    async fn put(&self, table: &str, record: &StoredRecord) -> Result<(), StatusStoreError>;

    /// Set the status of the record keyed by `id`
    ///
    /// Upserts: an absent key yields a record holding only `id` and `status`.
    async fn update_status(
        &self,
        table: &str,
        id: &str,
        status: RecordStatus,
    ) -> Result<(), StatusStoreError>;

    /// Read the record keyed by `id`
    async fn get(&self, table: &str, id: &str) -> Result<Option<StoredRecord>, StatusStoreError>;
}

/// Reject table names the bundled adapters cannot key on
pub(crate) fn validate_table_name(table: &str) -> Result<(), StatusStoreError> {
    if table.is_empty() {
        return Err(StatusStoreError::InvalidTable {
            table: table.to_string(),
            message: "table name is empty".to_string(),
        });
    }

    if !table
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        || table.starts_with('.')
    {
        return Err(StatusStoreError::InvalidTable {
            table: table.to_string(),
            message: "only alphanumerics, '-', '_' and '.' are allowed".to_string(),
        });
    }

    Ok(())
}
