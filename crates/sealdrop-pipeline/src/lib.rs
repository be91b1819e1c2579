//! Sealdrop Pipeline
//!
//! Turns one uploaded byte stream into a verifiable proof-of-existence
//! record: hash the content, store the bytes with public visibility, index
//! the record, sign the digest with the service identity, and anchor it on
//! the ledger. The orchestrator owns the partial-failure policy across
//! those three independently failing systems; the reconciler settles
//! anchors that were still pending when their upload finished; the
//! verification service answers whether a digest is anchored at all.

pub mod orchestrator;
pub mod reconcile;
pub mod response;
pub mod telemetry;
pub mod verification;

pub use orchestrator::{
    AnchorFailure, AnchorOutcome, PipelineConfig, PipelineOrchestrator, UploadError,
    UploadOutcome, UploadRequest,
};
pub use reconcile::{AnchorReconciler, ReconcileSummary, ReconcilerConfig, ReconcilerHandle};
pub use response::{AnchorReport, ErrorResponse, UploadResponse, TX_HASH_NONE};
pub use telemetry::init_tracing;
pub use verification::VerificationService;
