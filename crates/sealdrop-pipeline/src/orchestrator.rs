//! Upload pipeline orchestration
//!
//! One upload moves through a fixed order of steps: validate, hash, store,
//! index, sign, anchor, confirm. The steps talk to three independently
//! failing systems with no transaction spanning them, so the failure policy
//! is positional:
//!
//! - before the store call, any error aborts with no external effect;
//! - a store failure aborts before anything was indexed;
//! - an index failure after a successful store is fatal and reports the
//!   stored object as orphaned, because the bytes are durable but no record
//!   points at them;
//! - once the provisional record exists, signing and ledger errors no longer
//!   fail the upload. They are logged and folded into a degraded outcome:
//!   the file is shared, the proof-of-existence is not.

use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use sealdrop_core::{digest_bytes, AnchorReceipt, Digest, DigestHasher, FileRecord, ObjectLocator};
use sealdrop_index::{IndexError, MetadataIndex};
use sealdrop_ledger::{LedgerClient, LedgerError, Signer, SigningError};
use sealdrop_storage::{ObjectStore, StorageError};

/// Read granularity for streamed uploads.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// One file to run through the pipeline.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    pub content: Bytes,
    /// Identity of whoever submitted the file. Carried into the upload span;
    /// anchors are always signed with the service identity.
    pub submitter: Option<String>,
    /// Digest the caller claims the content has. Checked against the
    /// recomputed digest before anything leaves the process.
    pub claimed_digest: Option<Digest>,
}

impl UploadRequest {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            content: content.into(),
            submitter: None,
            claimed_digest: None,
        }
    }

    pub fn with_submitter(mut self, submitter: impl Into<String>) -> Self {
        self.submitter = Some(submitter.into());
        self
    }

    pub fn with_claimed_digest(mut self, digest: Digest) -> Self {
        self.claimed_digest = Some(digest);
        self
    }
}

/// Upload pipeline errors
///
/// Only three ways an upload fails outright. Signing and ledger problems are
/// not here: by the time they can occur the record exists, and they degrade
/// the outcome instead of failing it.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    Validation(String),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Reading upload content failed: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Index write failed, stored object {object_key} ({locator}) is orphaned: {source}")]
    Index {
        object_key: String,
        locator: ObjectLocator,
        #[source]
        source: IndexError,
    },
}

impl UploadError {
    /// True when the request itself was at fault and retrying unchanged
    /// cannot succeed.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, UploadError::Validation(_))
    }
}

/// Why anchoring did not complete for an otherwise successful upload.
#[derive(Debug, thiserror::Error)]
pub enum AnchorFailure {
    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Anchor side of a completed upload.
#[derive(Debug)]
pub enum AnchorOutcome {
    /// The submission was accepted; the receipt carries the last observed
    /// confirmation status.
    Anchored(AnchorReceipt),
    /// Signing or submission failed; the record exists without an anchor.
    Degraded(AnchorFailure),
}

impl AnchorOutcome {
    pub fn is_anchored(&self) -> bool {
        matches!(self, AnchorOutcome::Anchored(_))
    }

    pub fn receipt(&self) -> Option<&AnchorReceipt> {
        match self {
            AnchorOutcome::Anchored(receipt) => Some(receipt),
            AnchorOutcome::Degraded(_) => None,
        }
    }
}

/// A completed upload.
#[derive(Debug)]
pub struct UploadOutcome {
    /// The index record as inserted. When `anchor` is `Anchored` the receipt
    /// has also been attached to this record in the index.
    pub record: FileRecord,
    pub anchor: AnchorOutcome,
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long `upload` waits for anchor confirmation before handing the
    /// pending receipt to the reconciliation sweep.
    pub confirm_timeout: std::time::Duration,
    pub max_file_size_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: std::time::Duration::from_secs(90),
            max_file_size_bytes: 25 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &sealdrop_core::Config) -> Self {
        Self {
            confirm_timeout: config.confirm_timeout(),
            max_file_size_bytes: config.max_file_size_bytes,
        }
    }
}

/// Drives uploads through hash, store, index, sign, and anchor.
pub struct PipelineOrchestrator {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn MetadataIndex>,
    signer: Arc<dyn Signer>,
    ledger: Arc<dyn LedgerClient>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn MetadataIndex>,
        signer: Arc<dyn Signer>,
        ledger: Arc<dyn LedgerClient>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            index,
            signer,
            ledger,
            config,
        }
    }

    /// Run one buffered upload through the pipeline.
    #[tracing::instrument(
        skip(self, request),
        fields(file_name = %request.file_name, submitter = ?request.submitter)
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        let started = Instant::now();

        validate_file_name(&request.file_name)?;
        if request.content.len() > self.config.max_file_size_bytes {
            return Err(UploadError::Validation(format!(
                "file is {} bytes, above the {} byte limit",
                request.content.len(),
                self.config.max_file_size_bytes
            )));
        }

        let digest = digest_bytes(&request.content);
        if let Some(claimed) = request.claimed_digest {
            if claimed != digest {
                return Err(UploadError::Validation(format!(
                    "claimed digest {} does not match content digest {}",
                    claimed, digest
                )));
            }
        }

        let UploadRequest {
            file_name,
            content_type,
            content,
            ..
        } = request;
        self.execute(&file_name, &content_type, content, digest, started)
            .await
    }

    /// Run one streamed upload through the pipeline, hashing while the
    /// content is buffered.
    ///
    /// The payload still ends up in memory for the store call; this variant
    /// exists so callers can feed a file or socket directly and so oversized
    /// payloads are rejected as soon as the limit is crossed rather than
    /// after the whole stream was read.
    #[tracing::instrument(skip(self, reader), fields(file_name = %file_name))]
    pub async fn upload_streaming<R>(
        &self,
        file_name: &str,
        content_type: &str,
        mut reader: R,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = Instant::now();

        validate_file_name(file_name)?;

        let mut hasher = DigestHasher::new();
        let mut buffer = BytesMut::new();
        let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let read = reader.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            if buffer.len() + read > self.config.max_file_size_bytes {
                return Err(UploadError::Validation(format!(
                    "stream exceeds the {} byte limit",
                    self.config.max_file_size_bytes
                )));
            }
            hasher.update(&chunk[..read]);
            buffer.extend_from_slice(&chunk[..read]);
        }

        let digest = hasher.finalize();
        self.execute(file_name, content_type, buffer.freeze(), digest, started)
            .await
    }

    async fn execute(
        &self,
        file_name: &str,
        content_type: &str,
        content: Bytes,
        digest: Digest,
        started: Instant,
    ) -> Result<UploadOutcome, UploadError> {
        let size_bytes = content.len();
        tracing::debug!(digest = %digest, size_bytes, "Content hashed");

        let stored = self.store.put(file_name, content_type, content).await?;
        tracing::info!(
            digest = %digest,
            key = %stored.key,
            locator = %stored.locator,
            size_bytes,
            "Object stored"
        );

        let record = match self
            .index
            .insert_provisional(file_name, &stored.locator, &stored.key, &digest)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                // The bytes are durable but nothing points at them; hand the
                // key to whoever cleans up out of band.
                tracing::error!(
                    error = %e,
                    object_key = %stored.key,
                    locator = %stored.locator,
                    digest = %digest,
                    "Index write failed after storage, stored object is orphaned"
                );
                return Err(UploadError::Index {
                    object_key: stored.key,
                    locator: stored.locator,
                    source: e,
                });
            }
        };

        let anchor = match self.anchor_digest(&digest).await {
            Ok(receipt) => {
                if let Err(e) = self.index.attach_anchor(record.id, &receipt).await {
                    tracing::error!(
                        error = %e,
                        record_id = %record.id,
                        tx = %receipt.tx,
                        "Failed to record anchor receipt, record stays provisional in the index"
                    );
                }
                AnchorOutcome::Anchored(receipt)
            }
            Err(failure) => {
                tracing::warn!(
                    digest = %digest,
                    error = %failure,
                    "Anchoring failed, upload completes without an anchor"
                );
                AnchorOutcome::Degraded(failure)
            }
        };

        tracing::info!(
            record_id = %record.id,
            digest = %digest,
            anchored = anchor.is_anchored(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Upload pipeline completed"
        );

        Ok(UploadOutcome { record, anchor })
    }

    /// Sign the digest, submit it, and wait a bounded time for confirmation.
    ///
    /// A timeout is not an error here: the receipt comes back with whatever
    /// status was last observed, and the reconciliation sweep picks the
    /// record up later.
    async fn anchor_digest(&self, digest: &Digest) -> Result<AnchorReceipt, AnchorFailure> {
        let signature = self.signer.sign(digest)?;
        let account = self.signer.account();

        let mut receipt = self.ledger.anchor(digest, &signature, &account).await?;
        receipt.status = self
            .ledger
            .await_confirmation(&receipt.tx, self.config.confirm_timeout)
            .await;

        Ok(receipt)
    }
}

fn validate_file_name(file_name: &str) -> Result<(), UploadError> {
    if file_name.trim().is_empty() {
        return Err(UploadError::Validation(
            "file name must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builders_set_optional_fields() {
        let digest = digest_bytes(b"content");
        let request = UploadRequest::new("a.txt", "text/plain", Bytes::from_static(b"content"))
            .with_submitter("alice")
            .with_claimed_digest(digest);

        assert_eq!(request.submitter.as_deref(), Some("alice"));
        assert_eq!(request.claimed_digest, Some(digest));
    }

    #[test]
    fn only_validation_is_client_fault() {
        assert!(UploadError::Validation("empty".to_string()).is_client_fault());
        assert!(
            !UploadError::Storage(StorageError::Unreachable("down".to_string()))
                .is_client_fault()
        );
        assert!(!UploadError::Index {
            object_key: "drops/k".to_string(),
            locator: ObjectLocator::new("memory://sealdrop/drops/k"),
            source: IndexError::NotFound(uuid::Uuid::nil()),
        }
        .is_client_fault());
    }

    #[test]
    fn empty_file_names_fail_validation() {
        assert!(validate_file_name("report.pdf").is_ok());
        assert!(matches!(
            validate_file_name("   "),
            Err(UploadError::Validation(_))
        ));
    }
}
