use crate::{DriveStore, LocalStore, MemoryStore, ObjectStore, StorageError, StorageResult};
use sealdrop_core::{Config, StorageBackend};
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        StorageBackend::Drive => {
            let folder_id = config.drive_folder_id.clone().ok_or_else(|| {
                StorageError::ConfigError("DRIVE_FOLDER_ID not configured".to_string())
            })?;
            let access_token = config.drive_access_token.clone().ok_or_else(|| {
                StorageError::ConfigError("DRIVE_ACCESS_TOKEN not configured".to_string())
            })?;

            let store = DriveStore::new(config.drive_api_base.clone(), folder_id, access_token)?;
            Ok(Arc::new(store))
        }

        StorageBackend::Local => {
            let store = LocalStore::new(
                config.local_storage_path.clone(),
                config.local_storage_base_url.clone(),
            )
            .await?;
            Ok(Arc::new(store))
        }

        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
