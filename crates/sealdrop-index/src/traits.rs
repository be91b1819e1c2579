//! Metadata index abstraction
//!
//! The index is the local source of truth for what was uploaded: it maps
//! names to locators, digests, and anchor state. A record is inserted
//! provisionally (stored but not anchored) and enriched once the anchor
//! submission settles.

use async_trait::async_trait;
use sealdrop_core::{AnchorReceipt, AnchorStatus, Digest, FileRecord, ObjectLocator};
use thiserror::Error;
use uuid::Uuid;

/// Index operation errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Corrupted record {record_id}: {detail}")]
    Corrupted { record_id: Uuid, detail: String },
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Metadata index abstraction
///
/// Uploads are never deduplicated: inserting the same name or digest twice
/// creates two records, and digest lookups return every matching record in
/// insertion order.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    /// Insert a provisional record: named, stored, digested, not yet anchored.
    async fn insert_provisional(
        &self,
        file_name: &str,
        locator: &ObjectLocator,
        object_key: &str,
        digest: &Digest,
    ) -> IndexResult<FileRecord>;

    /// Attach an anchor receipt to a record.
    async fn attach_anchor(&self, record_id: Uuid, receipt: &AnchorReceipt) -> IndexResult<()>;

    /// Update the anchor status of a record that already carries a receipt.
    async fn update_anchor_status(
        &self,
        record_id: Uuid,
        status: AnchorStatus,
    ) -> IndexResult<()>;

    /// Fetch a record by id.
    async fn get(&self, record_id: Uuid) -> IndexResult<Option<FileRecord>>;

    /// All records carrying this digest, oldest first.
    async fn find_by_digest(&self, digest: &Digest) -> IndexResult<Vec<FileRecord>>;

    /// All records uploaded under this name, oldest first.
    async fn find_by_name(&self, file_name: &str) -> IndexResult<Vec<FileRecord>>;

    /// Records whose anchor is still pending, oldest submission first.
    async fn list_pending_anchors(&self, limit: i64) -> IndexResult<Vec<FileRecord>>;
}
