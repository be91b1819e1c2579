//! Index backend selection from configuration.

use std::sync::Arc;

use sealdrop_core::{Config, IndexBackend};

use crate::memory::MemoryIndex;
use crate::pg::PgIndex;
use crate::setup::setup_database;
use crate::traits::MetadataIndex;

/// Creates the metadata index configured by `INDEX_BACKEND`.
pub async fn create_index(config: &Config) -> anyhow::Result<Arc<dyn MetadataIndex>> {
    match config.index_backend {
        IndexBackend::Postgres => {
            let pool = setup_database(config).await?;
            Ok(Arc::new(PgIndex::new(pool)))
        }
        IndexBackend::Memory => {
            tracing::info!("Using in-memory metadata index");
            Ok(Arc::new(MemoryIndex::new()))
        }
    }
}
