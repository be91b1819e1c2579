//! In-memory metadata index for tests and single-process deployments.
//!
//! Records live in a Vec behind an RwLock and are gone when the process
//! exits. Lookup semantics match the Postgres implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sealdrop_core::{AnchorReceipt, AnchorStatus, Digest, FileRecord, ObjectLocator};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::traits::{IndexError, IndexResult, MetadataIndex};

#[derive(Clone, Default)]
pub struct MemoryIndex {
    records: Arc<RwLock<Vec<FileRecord>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl MetadataIndex for MemoryIndex {
    async fn insert_provisional(
        &self,
        file_name: &str,
        locator: &ObjectLocator,
        object_key: &str,
        digest: &Digest,
    ) -> IndexResult<FileRecord> {
        let record = FileRecord {
            id: Uuid::new_v4(),
            file_name: file_name.to_string(),
            locator: locator.clone(),
            object_key: object_key.to_string(),
            digest: *digest,
            anchor: None,
            created_at: Utc::now(),
            anchored_at: None,
        };
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn attach_anchor(&self, record_id: Uuid, receipt: &AnchorReceipt) -> IndexResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or(IndexError::NotFound(record_id))?;
        record.anchor = Some(receipt.clone());
        record.anchored_at = Some(Utc::now());
        Ok(())
    }

    async fn update_anchor_status(&self, record_id: Uuid, status: AnchorStatus) -> IndexResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or(IndexError::NotFound(record_id))?;
        match record.anchor.as_mut() {
            Some(receipt) => {
                receipt.status = status;
                Ok(())
            }
            // Same contract as Postgres: no receipt, nothing to update.
            None => Err(IndexError::NotFound(record_id)),
        }
    }

    async fn get(&self, record_id: Uuid) -> IndexResult<Option<FileRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == record_id).cloned())
    }

    async fn find_by_digest(&self, digest: &Digest) -> IndexResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        let mut matches: Vec<FileRecord> = records
            .iter()
            .filter(|r| r.digest == *digest)
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.created_at);
        Ok(matches)
    }

    async fn find_by_name(&self, file_name: &str) -> IndexResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        let mut matches: Vec<FileRecord> = records
            .iter()
            .filter(|r| r.file_name == file_name)
            .cloned()
            .collect();
        matches.sort_by_key(|r| r.created_at);
        Ok(matches)
    }

    async fn list_pending_anchors(&self, limit: i64) -> IndexResult<Vec<FileRecord>> {
        let records = self.records.read().await;
        let mut pending: Vec<FileRecord> = records
            .iter()
            .filter(|r| r.anchor_status() == Some(AnchorStatus::Pending))
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.anchored_at);
        pending.truncate(limit.max(0) as usize);
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdrop_core::{digest_bytes, Signature, TxRef};

    fn sample_receipt() -> AnchorReceipt {
        AnchorReceipt {
            digest: digest_bytes(b"payload"),
            signature: Signature::from_bytes([7u8; 64]),
            tx: TxRef::new(format!("0x{}", "ab".repeat(32))),
            status: AnchorStatus::Pending,
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let index = MemoryIndex::new();
        let digest = digest_bytes(b"payload");
        let locator = ObjectLocator::new("http://localhost:4000/files/drops/abc-report.pdf");

        let record = index
            .insert_provisional("report.pdf", &locator, "drops/abc-report.pdf", &digest)
            .await
            .unwrap();

        let fetched = index.get(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.file_name, "report.pdf");
        assert_eq!(fetched.digest, digest);
        assert!(fetched.anchor.is_none());
        assert!(fetched.anchored_at.is_none());
    }

    #[tokio::test]
    async fn get_unknown_id_returns_none() {
        let index = MemoryIndex::new();
        assert!(index.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn attach_anchor_sets_receipt_and_timestamp() {
        let index = MemoryIndex::new();
        let digest = digest_bytes(b"payload");
        let locator = ObjectLocator::new("memory://sealdrop/drops/k");
        let record = index
            .insert_provisional("a.txt", &locator, "drops/k", &digest)
            .await
            .unwrap();

        index.attach_anchor(record.id, &sample_receipt()).await.unwrap();

        let fetched = index.get(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.anchor_status(), Some(AnchorStatus::Pending));
        assert!(fetched.anchored_at.is_some());
    }

    #[tokio::test]
    async fn attach_anchor_unknown_id_is_not_found() {
        let index = MemoryIndex::new();
        let missing = Uuid::new_v4();
        let err = index.attach_anchor(missing, &sample_receipt()).await.unwrap_err();
        assert!(matches!(err, IndexError::NotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn update_status_requires_existing_receipt() {
        let index = MemoryIndex::new();
        let digest = digest_bytes(b"payload");
        let locator = ObjectLocator::new("memory://sealdrop/drops/k");
        let record = index
            .insert_provisional("a.txt", &locator, "drops/k", &digest)
            .await
            .unwrap();

        let err = index
            .update_anchor_status(record.id, AnchorStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));

        index.attach_anchor(record.id, &sample_receipt()).await.unwrap();
        index
            .update_anchor_status(record.id, AnchorStatus::Confirmed)
            .await
            .unwrap();

        let fetched = index.get(record.id).await.unwrap().unwrap();
        assert_eq!(fetched.anchor_status(), Some(AnchorStatus::Confirmed));
    }

    #[tokio::test]
    async fn find_by_digest_returns_all_matches_oldest_first() {
        let index = MemoryIndex::new();
        let digest = digest_bytes(b"same bytes");
        let other = digest_bytes(b"different bytes");

        let first = index
            .insert_provisional(
                "one.bin",
                &ObjectLocator::new("memory://sealdrop/drops/one"),
                "drops/one",
                &digest,
            )
            .await
            .unwrap();
        index
            .insert_provisional(
                "other.bin",
                &ObjectLocator::new("memory://sealdrop/drops/other"),
                "drops/other",
                &other,
            )
            .await
            .unwrap();
        let second = index
            .insert_provisional(
                "two.bin",
                &ObjectLocator::new("memory://sealdrop/drops/two"),
                "drops/two",
                &digest,
            )
            .await
            .unwrap();

        let matches = index.find_by_digest(&digest).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, first.id);
        assert_eq!(matches[1].id, second.id);
    }

    #[tokio::test]
    async fn list_pending_anchors_skips_settled_records() {
        let index = MemoryIndex::new();
        let digest = digest_bytes(b"payload");

        let pending = index
            .insert_provisional(
                "pending.txt",
                &ObjectLocator::new("memory://sealdrop/drops/p"),
                "drops/p",
                &digest,
            )
            .await
            .unwrap();
        let confirmed = index
            .insert_provisional(
                "confirmed.txt",
                &ObjectLocator::new("memory://sealdrop/drops/c"),
                "drops/c",
                &digest,
            )
            .await
            .unwrap();
        let provisional = index
            .insert_provisional(
                "provisional.txt",
                &ObjectLocator::new("memory://sealdrop/drops/v"),
                "drops/v",
                &digest,
            )
            .await
            .unwrap();

        index.attach_anchor(pending.id, &sample_receipt()).await.unwrap();
        index.attach_anchor(confirmed.id, &sample_receipt()).await.unwrap();
        index
            .update_anchor_status(confirmed.id, AnchorStatus::Confirmed)
            .await
            .unwrap();

        let listed = index.list_pending_anchors(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);

        // Records that never reached the ledger are not reconciler work.
        assert!(!listed.iter().any(|r| r.id == provisional.id));
    }

    #[tokio::test]
    async fn list_pending_anchors_honors_limit() {
        let index = MemoryIndex::new();
        let digest = digest_bytes(b"payload");
        for i in 0..5 {
            let record = index
                .insert_provisional(
                    &format!("file-{i}.txt"),
                    &ObjectLocator::new(format!("memory://sealdrop/drops/{i}")),
                    &format!("drops/{i}"),
                    &digest,
                )
                .await
                .unwrap();
            index.attach_anchor(record.id, &sample_receipt()).await.unwrap();
        }

        let listed = index.list_pending_anchors(3).await.unwrap();
        assert_eq!(listed.len(), 3);
    }
}
