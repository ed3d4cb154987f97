use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::{check_key, BlobStore};
use crate::error::StorageError;

/// Filesystem-backed blob store: `<root>/<bucket>/<key>`.
///
/// The dashboard and the backend can share one root directory to exchange
/// uploads and results without any cloud account.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        check_key(bucket)?;
        if bucket.contains(['/', '\\']) {
            return Err(StorageError::InvalidKey {
                key: bucket.to_string(),
                reason: "bucket must be a single path segment",
            });
        }
        check_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn upload(&self, data: Bytes, bucket: &str, key: &str) -> Result<String, StorageError> {
        let path = self.object_path(bucket, key)?;
        log::info!("Uploading {} bytes to {}", data.len(), path.display());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| io_error(&path, e))?;
        log::info!("Upload successful: {bucket}/{key}");
        Ok(key.to_string())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let path = self.object_path(bucket, key)?;
        log::info!(
            "Copying {} to local file {}...",
            path.display(),
            local_path.display()
        );
        match tokio::fs::copy(&path, local_path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound && !path.exists() => {
                Err(StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(io_error(local_path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn objects_live_under_root_and_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        assert_eq!(store.root(), dir.path());
        store
            .upload(Bytes::from("abc"), "scratch", "f/uploads/x.csv")
            .await
            .unwrap();
        assert!(dir.path().join("scratch/f/uploads/x.csv").is_file());
        assert_eq!(
            store.get("scratch", "f/uploads/x.csv").await.unwrap(),
            Bytes::from("abc")
        );
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err = store.get("scratch", "nope.csv").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let target = dir.path().join("out.csv");
        let err = store
            .download("scratch", "nope.csv", &target)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn download_copies_the_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("store"));
        store
            .upload(Bytes::from("SYMBOL,s1\n"), "scratch", "k.csv")
            .await
            .unwrap();
        let target = dir.path().join("copy.csv");
        store.download("scratch", "k.csv", &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"SYMBOL,s1\n");
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err = store
            .upload(Bytes::from("x"), "scratch", "../escape.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey { .. }));
        let err = store
            .upload(Bytes::from("x"), "a/b", "k.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey { .. }));
    }
}
