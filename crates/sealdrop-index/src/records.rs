//! Row type for the file_records table.

use chrono::{DateTime, Utc};
use sealdrop_core::{AnchorReceipt, Digest, FileRecord, ObjectLocator, Signature, TxRef};
use uuid::Uuid;

use crate::traits::IndexError;

/// Row type for file_records table (for FromRow).
///
/// Digest, signature, and status are stored as text and parsed back into
/// their domain types; the three anchor columns are set together or not at
/// all.
#[derive(Debug, sqlx::FromRow)]
pub struct FileRecordRow {
    pub id: Uuid,
    pub file_name: String,
    pub locator: String,
    pub object_key: String,
    pub digest: String,
    pub tx_ref: Option<String>,
    pub anchor_status: Option<String>,
    pub signature: Option<String>,
    pub created_at: DateTime<Utc>,
    pub anchored_at: Option<DateTime<Utc>>,
}

impl FileRecordRow {
    pub fn to_file_record(self) -> Result<FileRecord, IndexError> {
        let record_id = self.id;
        let corrupted = |detail: String| IndexError::Corrupted { record_id, detail };

        let digest: Digest = self
            .digest
            .trim()
            .parse()
            .map_err(|e| corrupted(format!("digest: {}", e)))?;

        let anchor = match (self.tx_ref, self.anchor_status, self.signature) {
            (Some(tx), Some(status), Some(signature)) => {
                let status = status
                    .parse()
                    .map_err(|e| corrupted(format!("anchor_status: {}", e)))?;
                let signature: Signature = signature
                    .parse()
                    .map_err(|e| corrupted(format!("signature: {}", e)))?;
                Some(AnchorReceipt {
                    digest,
                    signature,
                    tx: TxRef::new(tx),
                    status,
                })
            }
            (None, None, None) => None,
            _ => {
                return Err(corrupted(
                    "anchor columns are partially populated".to_string(),
                ))
            }
        };

        Ok(FileRecord {
            id: self.id,
            file_name: self.file_name,
            locator: ObjectLocator::new(self.locator),
            object_key: self.object_key,
            digest,
            anchor,
            created_at: self.created_at,
            anchored_at: self.anchored_at,
        })
    }
}
