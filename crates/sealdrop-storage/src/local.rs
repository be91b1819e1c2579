use crate::keys;
use crate::traits::{ObjectStore, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use sealdrop_core::{ObjectLocator, StorageBackend};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Objects live under `base_path` and are served by an external static file
/// collaborator under `base_url`, so the locator is valid as soon as the
/// bytes are on disk.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStore {
    /// Create a new LocalStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/sealdrop/objects")
    /// * `base_url` - Base URL the objects are served under (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore {
            base_path,
            base_url,
        })
    }

    /// Convert an object key to a filesystem path with security validation
    ///
    /// Rejects keys that could escape the base storage directory.
    fn key_to_path(&self, object_key: &str) -> StorageResult<PathBuf> {
        if object_key.contains("..") || object_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Object key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(object_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Object key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Generate the public locator for a key
    fn generate_locator(&self, key: &str) -> ObjectLocator {
        ObjectLocator::new(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        file_name: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredObject> {
        let key = keys::generate_object_key(file_name);
        let path = self.key_to_path(&key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let locator = self.generate_locator(&key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(StoredObject { key, locator })
    }

    async fn get(&self, object_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(object_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(object_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %object_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage get successful"
        );

        Ok(data)
    }

    async fn delete(&self, object_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(object_key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), key = %object_key, "Local storage delete successful");

        Ok(())
    }

    async fn exists(&self, object_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(object_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_store(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::new(dir.path(), "http://localhost:4000/files".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let data = Bytes::from_static(b"test data");
        let stored = store.put("test.txt", "text/plain", data.clone()).await.unwrap();

        assert!(stored.key.ends_with("test.txt"));
        assert!(stored.locator.as_str().starts_with("http://localhost:4000/files/"));

        let read_back = store.get(&stored.key).await.unwrap();
        assert_eq!(read_back, data.to_vec());
    }

    #[tokio::test]
    async fn identical_payloads_get_distinct_keys() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let data = Bytes::from_static(b"same bytes");
        let first = store.put("dup.bin", "application/octet-stream", data.clone()).await.unwrap();
        let second = store.put("dup.bin", "application/octet-stream", data).await.unwrap();

        assert_ne!(first.key, second.key);
        assert_ne!(first.locator, second.locator);
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let result = store.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn delete_missing_object_is_ok() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        assert!(store.delete("drops/nonexistent.txt").await.is_ok());
    }

    #[tokio::test]
    async fn exists_reflects_stored_objects() {
        let dir = tempdir().unwrap();
        let store = test_store(&dir).await;

        let stored = store
            .put("exists.txt", "text/plain", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(store.exists(&stored.key).await.unwrap());
        assert!(!store.exists("drops/nope.txt").await.unwrap());
    }
}
