//! Shared fixtures for pipeline integration tests: a fully in-memory
//! pipeline plus collaborator doubles that fail on purpose.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use sealdrop_core::{
    AccountId, AnchorReceipt, AnchorStatus, Digest, FileRecord, ObjectLocator, Signature,
    StorageBackend,
};
use sealdrop_index::{IndexError, IndexResult, MemoryIndex, MetadataIndex};
use sealdrop_ledger::{Ed25519Signer, InProcessLedger, Signer, SigningError};
use sealdrop_pipeline::{PipelineConfig, PipelineOrchestrator};
use sealdrop_storage::{MemoryStore, ObjectStore, StorageError, StorageResult, StoredObject};

/// A pipeline wired to in-memory collaborators, with handles to each of
/// them so tests can assert on their state directly.
pub struct TestPipeline {
    pub orchestrator: PipelineOrchestrator,
    pub store: Arc<MemoryStore>,
    pub index: Arc<MemoryIndex>,
    pub ledger: Arc<InProcessLedger>,
    pub signer: Arc<Ed25519Signer>,
}

impl TestPipeline {
    pub fn account(&self) -> AccountId {
        self.signer.account()
    }
}

pub fn setup_pipeline() -> TestPipeline {
    setup_pipeline_with(InProcessLedger::new(), PipelineConfig::default())
}

pub fn setup_pipeline_with(ledger: InProcessLedger, config: PipelineConfig) -> TestPipeline {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(MemoryIndex::new());
    let ledger = Arc::new(ledger);
    let signer = Arc::new(Ed25519Signer::generate());

    let orchestrator = PipelineOrchestrator::new(
        store.clone(),
        index.clone(),
        signer.clone(),
        ledger.clone(),
        config,
    );

    TestPipeline {
        orchestrator,
        store,
        index,
        ledger,
        signer,
    }
}

/// Object store that refuses every write.
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(
        &self,
        _file_name: &str,
        _content_type: &str,
        _data: Bytes,
    ) -> StorageResult<StoredObject> {
        Err(StorageError::Unreachable("store is down".to_string()))
    }

    async fn get(&self, object_key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(object_key.to_string()))
    }

    async fn delete(&self, _object_key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _object_key: &str) -> StorageResult<bool> {
        Ok(false)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Metadata index whose writes always fail, as an unreachable database would.
pub struct FailingIndex;

#[async_trait]
impl MetadataIndex for FailingIndex {
    async fn insert_provisional(
        &self,
        _file_name: &str,
        _locator: &ObjectLocator,
        _object_key: &str,
        _digest: &Digest,
    ) -> IndexResult<FileRecord> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn attach_anchor(&self, _record_id: Uuid, _receipt: &AnchorReceipt) -> IndexResult<()> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn update_anchor_status(
        &self,
        _record_id: Uuid,
        _status: AnchorStatus,
    ) -> IndexResult<()> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn get(&self, _record_id: Uuid) -> IndexResult<Option<FileRecord>> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn find_by_digest(&self, _digest: &Digest) -> IndexResult<Vec<FileRecord>> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn find_by_name(&self, _file_name: &str) -> IndexResult<Vec<FileRecord>> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn list_pending_anchors(&self, _limit: i64) -> IndexResult<Vec<FileRecord>> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }
}

/// Index that accepts records but loses its database before the anchor
/// receipt can be attached.
pub struct AttachFailingIndex {
    pub inner: MemoryIndex,
}

impl AttachFailingIndex {
    pub fn new() -> Self {
        Self {
            inner: MemoryIndex::new(),
        }
    }
}

#[async_trait]
impl MetadataIndex for AttachFailingIndex {
    async fn insert_provisional(
        &self,
        file_name: &str,
        locator: &ObjectLocator,
        object_key: &str,
        digest: &Digest,
    ) -> IndexResult<FileRecord> {
        self.inner
            .insert_provisional(file_name, locator, object_key, digest)
            .await
    }

    async fn attach_anchor(&self, _record_id: Uuid, _receipt: &AnchorReceipt) -> IndexResult<()> {
        Err(IndexError::Database(sqlx::Error::PoolClosed))
    }

    async fn update_anchor_status(
        &self,
        record_id: Uuid,
        status: AnchorStatus,
    ) -> IndexResult<()> {
        self.inner.update_anchor_status(record_id, status).await
    }

    async fn get(&self, record_id: Uuid) -> IndexResult<Option<FileRecord>> {
        self.inner.get(record_id).await
    }

    async fn find_by_digest(&self, digest: &Digest) -> IndexResult<Vec<FileRecord>> {
        self.inner.find_by_digest(digest).await
    }

    async fn find_by_name(&self, file_name: &str) -> IndexResult<Vec<FileRecord>> {
        self.inner.find_by_name(file_name).await
    }

    async fn list_pending_anchors(&self, limit: i64) -> IndexResult<Vec<FileRecord>> {
        self.inner.list_pending_anchors(limit).await
    }
}

/// Signer with no usable key material.
pub struct RefusingSigner;

impl Signer for RefusingSigner {
    fn account(&self) -> AccountId {
        AccountId::from_key_bytes(&[0u8; 32])
    }

    fn sign(&self, _digest: &Digest) -> Result<Signature, SigningError> {
        Err(SigningError::NoKeyMaterial)
    }
}
