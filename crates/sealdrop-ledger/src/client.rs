//! Ledger client abstraction
//!
//! This module defines the LedgerClient trait for the fixed anchor contract
//! surface, and the three-way error taxonomy every backend maps into.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use sealdrop_core::{AccountId, AnchorReceipt, AnchorStatus, Digest, Signature, TxRef};

/// Why a ledger operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    /// The submitting account cannot cover the anchor fee.
    InsufficientFunds,
    /// The ledger refused the submission (bad sequence, bad signature,
    /// contract revert).
    Rejected,
    /// The ledger endpoint could not be reached or did not answer sensibly.
    Unreachable,
}

impl Display for LedgerErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LedgerErrorKind::InsufficientFunds => write!(f, "insufficient funds"),
            LedgerErrorKind::Rejected => write!(f, "rejected"),
            LedgerErrorKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Ledger operation error
#[derive(Debug, Clone, thiserror::Error)]
#[error("Ledger {kind}: {message}")]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        Self {
            kind: LedgerErrorKind::InsufficientFunds,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: LedgerErrorKind::Rejected,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            kind: LedgerErrorKind::Unreachable,
            message: message.into(),
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.kind == LedgerErrorKind::InsufficientFunds
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Client for the anchor contract surface.
///
/// Submissions carry a per-account strictly increasing sequence number.
/// Implementations must serialize their own submissions so that concurrent
/// `anchor` calls through one client never race on a sequence; out-of-order
/// submissions are rejected by the ledger itself.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a signed digest for anchoring.
    ///
    /// Returns a receipt with `Pending` status; confirmation is observed
    /// separately via [`await_confirmation`](Self::await_confirmation).
    async fn anchor(
        &self,
        digest: &Digest,
        signature: &Signature,
        account: &AccountId,
    ) -> LedgerResult<AnchorReceipt>;

    /// Wait up to `timeout` for a transaction to settle.
    ///
    /// Never fails: poll errors and timeouts yield the best-known status,
    /// which is `Pending` when nothing newer was observed.
    async fn await_confirmation(&self, tx: &TxRef, timeout: Duration) -> AnchorStatus;

    /// Single observation of a transaction's current status.
    async fn transaction_status(&self, tx: &TxRef) -> LedgerResult<AnchorStatus>;

    /// Check whether a digest is anchored, returning its owner when it is.
    async fn verify_file(&self, digest: &Digest) -> LedgerResult<Option<AccountId>>;

    /// Fetch the owner and signature recorded for a digest.
    ///
    /// Returns `Ok(None)` for digests that were never anchored; the
    /// existence check happens first because the detail lookup on the
    /// contract reverts for unknown digests.
    async fn get_file_details(&self, digest: &Digest)
        -> LedgerResult<Option<(AccountId, Signature)>>;
}
