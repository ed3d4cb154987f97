//! Blob storage abstraction.
//!
//! The backend only needs three operations from object storage: upload a
//! buffer, download an object to a local file, and read an object as a table.
//! Three implementations are provided:
//!
//! - [`MemoryBlobStore`]: in-process map, for tests and demos.
//! - [`LocalBlobStore`]: one directory per bucket under a root directory.
//! - [`HttpBlobStore`]: S3-compatible path-style HTTP (`GET`/`PUT
//!   {endpoint}/{bucket}/{key}`), e.g. LocalStack.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::data::{parse_bytes, RawTable, TableFormat};
use crate::error::StorageError;

mod http;
mod local;
mod memory;

pub use http::{HttpBlobStore, RetryPolicy};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// Object storage used for uploads and processed results.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Store `data` under `bucket/key`, replacing any existing object.
    /// Returns the key the object was stored under.
    async fn upload(&self, data: Bytes, bucket: &str, key: &str) -> Result<String, StorageError>;

    /// Read a whole object.
    ///
    /// Returns `StorageError::NotFound` if the object doesn't exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Copy an object into a local file, creating or truncating it.
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        log::info!(
            "Downloading {bucket}/{key} to local file {}...",
            local_path.display()
        );
        let data = self.get(bucket, key).await?;
        tokio::fs::write(local_path, &data)
            .await
            .map_err(|source| StorageError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;
        log::info!("Downloaded {} bytes from {bucket}/{key}", data.len());
        Ok(())
    }

    /// Read an object and parse it as a table; the format follows the key's
    /// extension.
    async fn read_table(&self, bucket: &str, key: &str) -> Result<RawTable, StorageError> {
        log::info!("Reading table from {bucket}/{key}...");
        let data = self.get(bucket, key).await?;
        let table = parse_bytes(data, TableFormat::from_key(key)).map_err(|source| {
            StorageError::Table {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source,
            }
        })?;
        log::info!(
            "Table read successfully ({} rows, {} columns)",
            table.n_rows(),
            table.n_columns()
        );
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Key layout
// ---------------------------------------------------------------------------

/// A fresh per-upload folder: `<unix-seconds>-<uuid>`.
pub fn unique_folder() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{timestamp}-{}", Uuid::new_v4())
}

/// Where the dashboard puts a raw upload.
pub fn upload_key(folder: &str, file_name: &str) -> String {
    format!("{folder}/uploads/{file_name}")
}

/// Where the backend puts the processed table of a task.
pub fn processed_key(folder: &str, task_id: &str) -> String {
    format!("{folder}/processed/{task_id}_processed.csv")
}

/// Reject keys that could escape a bucket when mapped onto a filesystem or
/// URL path.
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason| StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.trim().is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') || key.starts_with('\\') {
        return Err(invalid("key must be relative"));
    }
    if key.split(['/', '\\']).any(|part| part == ".." || part == ".") {
        return Err(invalid("key must not contain '.' or '..' segments"));
    }
    if key.contains('\0') {
        return Err(invalid("key must not contain NUL"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout() {
        assert_eq!(upload_key("f", "counts.csv"), "f/uploads/counts.csv");
        assert_eq!(
            processed_key("f", "task_1"),
            "f/processed/task_1_processed.csv"
        );
    }

    #[test]
    fn unique_folders_differ() {
        let a = unique_folder();
        let b = unique_folder();
        assert_ne!(a, b);
        assert!(a.split_once('-').unwrap().0.parse::<u64>().is_ok());
    }

    #[test]
    fn keys_cannot_escape() {
        assert!(check_key("a/b.csv").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("/etc/passwd").is_err());
        assert!(check_key("a/../../b").is_err());
        assert!(check_key("a\\..\\b").is_err());
    }
}
