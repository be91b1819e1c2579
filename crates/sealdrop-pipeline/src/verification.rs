//! On-demand digest verification.

use std::sync::Arc;

use sealdrop_core::{Digest, VerificationResult};
use sealdrop_ledger::{LedgerClient, LedgerError};

/// Read-only check of whether a digest is anchored.
///
/// Answers from the ledger alone. The index never participates, so the
/// result holds for any digest holder, not just the uploader, and reflects
/// confirmed ledger state rather than what this service believes it
/// submitted.
#[derive(Clone)]
pub struct VerificationService {
    ledger: Arc<dyn LedgerClient>,
}

impl VerificationService {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    #[tracing::instrument(skip(self), fields(digest = %digest))]
    pub async fn verify(&self, digest: &Digest) -> Result<VerificationResult, LedgerError> {
        match self.ledger.get_file_details(digest).await? {
            Some((owner, signature)) => {
                tracing::debug!(owner = %owner, "Digest is anchored");
                Ok(VerificationResult::anchored(*digest, owner, signature))
            }
            None => Ok(VerificationResult::absent(*digest)),
        }
    }
}
