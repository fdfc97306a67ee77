//! # Filesystem Status Store Adapter
//!
//! Local filesystem implementation of [`StatusStore`] for single-host deployments
//! and the operator CLI.

use crate::codec::StoredRecord;
use crate::status_store::{validate_table_name, StatusStore, StatusStoreError};
use crate::RecordStatus;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Longest file name most filesystems accept
const MAX_FILE_NAME_LEN: usize = 255;

/// Filesystem-based status store
///
/// Stores each record as a typed-attribute JSON file at
/// `{base_path}/{table}/id-{hex(id)}.json`. Ids are hex-encoded so any string,
/// including the empty string, maps to a safe file name. Ids whose hex name
/// would exceed the file name limit are stored as `sha256-{digest}.json`.
///
/// # Examples
///
/// ```no_run
/// use record_relay_core::adapters::FilesystemStatusStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemStatusStore::new(PathBuf::from("./data/status")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemStatusStore {
    base_path: PathBuf,
}

impl FilesystemStatusStore {
    /// Create new filesystem status store
    ///
    /// # Errors
    ///
    /// Returns error if base path cannot be created or accessed.
    pub async fn new(base_path: PathBuf) -> Result<Self, StatusStoreError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StatusStoreError::Unavailable {
                message: format!("Failed to create base directory: {}", e),
            })?;

        Ok(Self { base_path })
    }

    /// Base directory of the store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, table: &str, id: &str) -> PathBuf {
        self.base_path.join(table).join(record_file_name(id))
    }

    async fn read_record(&self, path: &Path) -> Result<Option<StoredRecord>, StatusStoreError> {
        let contents = match fs::read(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StatusStoreError::Unavailable {
                    message: format!("Failed to read {}: {}", path.display(), e),
                })
            }
        };

        serde_json::from_slice(&contents)
            .map(Some)
            .map_err(|e| StatusStoreError::Serialization {
                message: format!("Failed to parse {}: {}", path.display(), e),
            })
    }

    async fn write_record(
        &self,
        path: &Path,
        record: &StoredRecord,
    ) -> Result<(), StatusStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StatusStoreError::Unavailable {
                    message: format!("Failed to create table directory: {}", e),
                })?;
        }

        let json =
            serde_json::to_vec_pretty(record).map_err(|e| StatusStoreError::Serialization {
                message: format!("Failed to serialize record: {}", e),
            })?;

        // Write to a unique temporary file first, then rename over the target
        let temp_name = format!(".tmp-{}", Uuid::new_v4().simple());
        let temp_path = match path.parent() {
            Some(parent) => parent.join(temp_name),
            None => PathBuf::from(temp_name),
        };
        let mut file =
            fs::File::create(&temp_path)
                .await
                .map_err(|e| StatusStoreError::Unavailable {
                    message: format!("Failed to create temp file: {}", e),
                })?;

        file.write_all(&json)
            .await
            .map_err(|e| StatusStoreError::Unavailable {
                message: format!("Failed to write record: {}", e),
            })?;

        file.flush()
            .await
            .map_err(|e| StatusStoreError::Unavailable {
                message: format!("Failed to flush file: {}", e),
            })?;
        drop(file);

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| StatusStoreError::Unavailable {
                message: format!("Failed to rename temp file: {}", e),
            })
    }
}

/// File name for a record id, bounded by [`MAX_FILE_NAME_LEN`]
fn record_file_name(id: &str) -> String {
    let name = format!("id-{}.json", hex::encode(id));
    if name.len() <= MAX_FILE_NAME_LEN {
        return name;
    }

    format!("sha256-{:x}.json", Sha256::digest(id.as_bytes()))
}

#[async_trait]
impl StatusStore for FilesystemStatusStore {
    async fn put(&self, table: &str, record: &StoredRecord) -> Result<(), StatusStoreError> {
        validate_table_name(table)?;
        let id = record
            .id()
            .ok_or_else(|| StatusStoreError::MissingKey { id: String::new() })?;

        self.write_record(&self.record_path(table, id), record).await
    }

    async fn update_status(
        &self,
        table: &str,
        id: &str,
        status: RecordStatus,
    ) -> Result<(), StatusStoreError> {
        validate_table_name(table)?;
        let path = self.record_path(table, id);

        let record = match self.read_record(&path).await? {
            Some(mut existing) => {
                existing.set_status(status);
                existing
            }
            None => StoredRecord::status_only(id, status),
        };

        self.write_record(&path, &record).await
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<StoredRecord>, StatusStoreError> {
        validate_table_name(table)?;
        self.read_record(&self.record_path(table, id)).await
    }
}

#[cfg(test)]
#[path = "filesystem_status_store_tests.rs"]
mod tests;
