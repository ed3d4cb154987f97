use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{check_key, BlobStore};
use crate::error::StorageError;

/// In-memory blob store for tests and offline demos.
///
/// Thread-safe via `RwLock`. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<(String, String), Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted keys stored in `bucket`.
    pub fn keys(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.read().map_err(|_| StorageError::Poisoned)?;
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upload(&self, data: Bytes, bucket: &str, key: &str) -> Result<String, StorageError> {
        check_key(key)?;
        log::info!("Uploading {} bytes to memory://{bucket}/{key}", data.len());
        self.objects
            .write()
            .map_err(|_| StorageError::Poisoned)?
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(key.to_string())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let objects = self.objects.read().map_err(|_| StorageError::Poisoned)?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_get() {
        let store = MemoryBlobStore::new();
        let key = store
            .upload(Bytes::from("hello"), "scratch", "a/b.txt")
            .await
            .expect("upload should succeed");
        assert_eq!(key, "a/b.txt");
        assert_eq!(
            store.get("scratch", "a/b.txt").await.unwrap(),
            Bytes::from("hello")
        );
        assert_eq!(store.keys("scratch").unwrap(), vec!["a/b.txt"]);
        assert!(store.keys("other").unwrap().is_empty());
    }

    #[tokio::test]
    async fn buckets_are_separate() {
        let store = MemoryBlobStore::new();
        store
            .upload(Bytes::from("x"), "one", "k.csv")
            .await
            .unwrap();
        let err = store.get("two", "k.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn download_writes_local_file() {
        let store = MemoryBlobStore::new();
        store
            .upload(Bytes::from("SYMBOL,s1\nA,1\n"), "scratch", "u/c.csv")
            .await
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.csv");
        store.download("scratch", "u/c.csv", &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"SYMBOL,s1\nA,1\n");
    }

    #[tokio::test]
    async fn read_table_parses_by_extension() {
        let store = MemoryBlobStore::new();
        store
            .upload(Bytes::from("SYMBOL\ts1\nA\t2\n"), "scratch", "u/c.tsv")
            .await
            .unwrap();
        let table = store.read_table("scratch", "u/c.tsv").await.unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.column_names(), ["SYMBOL", "s1"]);
    }

    #[tokio::test]
    async fn read_table_reports_parse_errors_as_storage_errors() {
        let store = MemoryBlobStore::new();
        store
            .upload(Bytes::from("SYMBOL,s1\nA,1,2\n"), "scratch", "bad.csv")
            .await
            .unwrap();
        let err = store.read_table("scratch", "bad.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::Table { .. }));
    }
}
