//! Object store abstraction trait
//!
//! This module defines the ObjectStore trait that all storage backends must
//! implement, along with the error taxonomy the pipeline depends on.

use async_trait::async_trait;
use bytes::Bytes;
use sealdrop_core::{ObjectLocator, StorageBackend};
use thiserror::Error;

/// Storage operation errors
///
/// `Unreachable`, `QuotaExceeded`, and `InvalidCredentials` cover the ways a
/// remote backend refuses an upload. `VisibilityNotGranted` means the bytes
/// were written but the object could not be made publicly readable, so no
/// valid locator exists; the key is carried for cleanup.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Visibility grant failed for {key}: {reason}")]
    VisibilityNotGranted { key: String, reason: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A durably stored object: its backend key and public locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Backend-internal identifier used for later reads and deletes.
    pub key: String,
    /// Publicly dereferenceable locator, valid only once visibility is granted.
    pub locator: ObjectLocator,
}

/// Object store abstraction trait
///
/// All storage backends (remote drive, local filesystem, in-memory) must
/// implement this trait. `put` is only allowed to return once the payload is
/// durably stored AND publicly readable through the returned locator; a
/// partially stored or unshared object must surface as an error instead.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a payload and return its key and public locator.
    ///
    /// Every call stores a fresh object under a fresh key, even for bytes
    /// that were stored before.
    async fn put(
        &self,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredObject>;

    /// Read back a stored payload by its key.
    async fn get(&self, object_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, object_key: &str) -> StorageResult<()>;

    /// Check if an object exists.
    async fn exists(&self, object_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
