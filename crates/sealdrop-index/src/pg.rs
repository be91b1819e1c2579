//! Postgres-backed metadata index over the file_records table.

use async_trait::async_trait;
use sealdrop_core::{AnchorReceipt, AnchorStatus, Digest, FileRecord, ObjectLocator};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::records::FileRecordRow;
use crate::traits::{IndexError, IndexResult, MetadataIndex};

/// Repository for file records.
#[derive(Clone)]
pub struct PgIndex {
    pool: PgPool,
}

impl PgIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataIndex for PgIndex {
    #[tracing::instrument(skip(self, locator), fields(db.table = "file_records"))]
    async fn insert_provisional(
        &self,
        file_name: &str,
        locator: &ObjectLocator,
        object_key: &str,
        digest: &Digest,
    ) -> IndexResult<FileRecord> {
        let row = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            INSERT INTO file_records (file_name, locator, object_key, digest)
            VALUES ($1, $2, $3, $4)
            RETURNING id, file_name, locator, object_key, digest,
                      tx_ref, anchor_status, signature, created_at, anchored_at
            "#,
        )
        .bind(file_name)
        .bind(locator.as_str())
        .bind(object_key)
        .bind(digest.to_hex())
        .fetch_one(&self.pool)
        .await?;
        row.to_file_record()
    }

    #[tracing::instrument(skip(self, receipt), fields(db.table = "file_records", tx = %receipt.tx))]
    async fn attach_anchor(&self, record_id: Uuid, receipt: &AnchorReceipt) -> IndexResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET tx_ref = $2, anchor_status = $3, signature = $4, anchored_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(receipt.tx.as_str())
        .bind(receipt.status.as_str())
        .bind(receipt.signature.to_hex())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IndexError::NotFound(record_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    async fn update_anchor_status(&self, record_id: Uuid, status: AnchorStatus) -> IndexResult<()> {
        // Only records that already carry a receipt can change status.
        let result = sqlx::query(
            r#"
            UPDATE file_records
            SET anchor_status = $2
            WHERE id = $1 AND tx_ref IS NOT NULL
            "#,
        )
        .bind(record_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(IndexError::NotFound(record_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    async fn get(&self, record_id: Uuid) -> IndexResult<Option<FileRecord>> {
        let row = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            SELECT id, file_name, locator, object_key, digest,
                   tx_ref, anchor_status, signature, created_at, anchored_at
            FROM file_records
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.to_file_record()).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    async fn find_by_digest(&self, digest: &Digest) -> IndexResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            SELECT id, file_name, locator, object_key, digest,
                   tx_ref, anchor_status, signature, created_at, anchored_at
            FROM file_records
            WHERE digest = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(digest.to_hex())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.to_file_record()).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    async fn find_by_name(&self, file_name: &str) -> IndexResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            SELECT id, file_name, locator, object_key, digest,
                   tx_ref, anchor_status, signature, created_at, anchored_at
            FROM file_records
            WHERE file_name = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(file_name)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.to_file_record()).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "file_records"))]
    async fn list_pending_anchors(&self, limit: i64) -> IndexResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            SELECT id, file_name, locator, object_key, digest,
                   tx_ref, anchor_status, signature, created_at, anchored_at
            FROM file_records
            WHERE anchor_status = 'pending'
            ORDER BY anchored_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.to_file_record()).collect()
    }
}
