//! Transport-agnostic response shapes
//!
//! Field names serialize in camelCase to match the wire format existing
//! clients consume: `downloadLink` and `transactionHash`, with the literal
//! `"N/A"` standing in for the transaction hash when anchoring did not
//! complete. The `anchor` field is the structured counterpart, so new
//! callers can tell a fully anchored upload from a degraded one without
//! comparing strings against the sentinel.

use serde::{Deserialize, Serialize};

use sealdrop_core::{AnchorStatus, TxRef};

use crate::orchestrator::{AnchorOutcome, UploadError, UploadOutcome};

/// Wire value of `transactionHash` when no anchor transaction exists.
pub const TX_HASH_NONE: &str = "N/A";

const UPLOAD_MESSAGE: &str = "File uploaded successfully";

/// Anchor half of an upload response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AnchorReport {
    /// The anchor transaction was submitted; `status` is the last observed
    /// confirmation state.
    Anchored { tx: TxRef, status: AnchorStatus },
    /// Signing or submission failed; the upload succeeded without an anchor.
    Degraded { reason: String },
}

/// Body of a successful upload response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub download_link: String,
    pub transaction_hash: String,
    pub anchor: AnchorReport,
}

impl UploadResponse {
    pub fn from_outcome(outcome: &UploadOutcome) -> Self {
        let (transaction_hash, anchor) = match &outcome.anchor {
            AnchorOutcome::Anchored(receipt) => (
                receipt.tx.as_str().to_string(),
                AnchorReport::Anchored {
                    tx: receipt.tx.clone(),
                    status: receipt.status,
                },
            ),
            AnchorOutcome::Degraded(failure) => (
                TX_HASH_NONE.to_string(),
                AnchorReport::Degraded {
                    reason: failure.to_string(),
                },
            ),
        };

        Self {
            message: UPLOAD_MESSAGE.to_string(),
            download_link: outcome.record.locator.as_str().to_string(),
            transaction_hash,
            anchor,
        }
    }

    /// True when the response carries a real transaction hash.
    pub fn is_anchored(&self) -> bool {
        self.transaction_hash != TX_HASH_NONE
    }
}

/// Body of a failed upload response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn from_error(error: &UploadError) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
