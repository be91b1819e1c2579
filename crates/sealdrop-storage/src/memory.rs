//! In-memory storage backend
//!
//! Backs dev mode and tests. Objects live in a shared map for the lifetime
//! of the process; locators are synthetic URLs under a fixed base.

use crate::keys;
use crate::traits::{ObjectStore, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use sealdrop_core::{ObjectLocator, StorageBackend};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation
#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    const BASE_URL: &'static str = "memory://sealdrop";

    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held.
    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        file_name: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredObject> {
        let key = keys::generate_object_key(file_name);
        let locator = ObjectLocator::new(format!("{}/{}", Self::BASE_URL, key));

        self.objects.write().await.insert(key.clone(), data);

        tracing::debug!(key = %key, "Memory storage put successful");

        Ok(StoredObject { key, locator })
    }

    async fn get(&self, object_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(object_key)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(object_key.to_string()))
    }

    async fn delete(&self, object_key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(object_key);
        Ok(())
    }

    async fn exists(&self, object_key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(object_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
