//! In-process ledger
//!
//! Dev-mode ledger that implements the anchor contract semantics in memory:
//! per-account strictly increasing sequence numbers, a flat fee charged per
//! submission, last-writer-wins digest records, and a configurable
//! confirmation delay. Submitted transactions settle into the contract state
//! only once their delay has elapsed, so pending anchors are invisible to
//! `verify_file` exactly as they are on a real chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use sealdrop_core::{digest_bytes, AccountId, AnchorReceipt, AnchorStatus, Digest, Signature, TxRef};

use crate::client::{LedgerClient, LedgerError, LedgerResult};
use crate::signer::verify_signature;

/// Fee charged per anchor submission.
pub const DEFAULT_ANCHOR_FEE: u64 = 10;

/// Balance granted to an account on first use.
pub const DEFAULT_INITIAL_BALANCE: u64 = 1_000;

struct ContractRecord {
    owner: AccountId,
    signature: Signature,
}

struct TxEntry {
    digest: Digest,
    signature: Signature,
    account: AccountId,
    status: AnchorStatus,
    confirm_at: Instant,
}

#[derive(Default)]
struct LedgerState {
    records: HashMap<Digest, ContractRecord>,
    transactions: HashMap<TxRef, TxEntry>,
    sequences: HashMap<AccountId, u64>,
    balances: HashMap<AccountId, u64>,
}

impl LedgerState {
    /// Settle every pending transaction whose confirmation delay has
    /// elapsed, materializing its record into contract state.
    fn apply_settled(&mut self, now: Instant) {
        for entry in self.transactions.values_mut() {
            if entry.status == AnchorStatus::Pending && entry.confirm_at <= now {
                entry.status = AnchorStatus::Confirmed;
                self.records.insert(
                    entry.digest,
                    ContractRecord {
                        owner: entry.account.clone(),
                        signature: entry.signature,
                    },
                );
            }
        }
    }
}

/// In-memory ledger implementation
pub struct InProcessLedger {
    state: Arc<Mutex<LedgerState>>,
    confirmation_delay: Duration,
    anchor_fee: u64,
    initial_balance: u64,
}

impl InProcessLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            confirmation_delay: Duration::ZERO,
            anchor_fee: DEFAULT_ANCHOR_FEE,
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }

    /// Delay between submission and confirmation.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn with_anchor_fee(mut self, fee: u64) -> Self {
        self.anchor_fee = fee;
        self
    }

    /// Set an account's balance explicitly, overriding the initial grant.
    pub async fn fund(&self, account: &AccountId, amount: u64) {
        self.state
            .lock()
            .await
            .balances
            .insert(account.clone(), amount);
    }

    pub async fn balance(&self, account: &AccountId) -> u64 {
        let state = self.state.lock().await;
        state
            .balances
            .get(account)
            .copied()
            .unwrap_or(self.initial_balance)
    }

    /// Sequence number the ledger expects from this account next.
    pub async fn next_sequence(&self, account: &AccountId) -> u64 {
        let state = self.state.lock().await;
        state.sequences.get(account).copied().unwrap_or(0)
    }

    /// Raw contract surface: submit with an explicit sequence number.
    ///
    /// [`anchor`](LedgerClient::anchor) wraps this with sequence assignment
    /// under the state lock; calling it directly with a stale or future
    /// sequence is rejected the way the ledger itself would.
    pub async fn store_file_hash(
        &self,
        digest: &Digest,
        signature: &Signature,
        account: &AccountId,
        sequence: u64,
    ) -> LedgerResult<TxRef> {
        let mut state = self.state.lock().await;
        self.submit_locked(&mut state, digest, signature, account, sequence)
    }

    fn submit_locked(
        &self,
        state: &mut LedgerState,
        digest: &Digest,
        signature: &Signature,
        account: &AccountId,
        sequence: u64,
    ) -> LedgerResult<TxRef> {
        let now = Instant::now();
        state.apply_settled(now);

        let expected = state.sequences.get(account).copied().unwrap_or(0);
        if sequence != expected {
            return Err(LedgerError::rejected(format!(
                "sequence {} does not match expected {}",
                sequence, expected
            )));
        }

        if !verify_signature(account, digest, signature) {
            return Err(LedgerError::rejected(
                "signature does not verify against submitting account".to_string(),
            ));
        }

        let balance = state
            .balances
            .entry(account.clone())
            .or_insert(self.initial_balance);
        if *balance < self.anchor_fee {
            return Err(LedgerError::insufficient_funds(format!(
                "balance {} below anchor fee {}",
                balance, self.anchor_fee
            )));
        }
        *balance -= self.anchor_fee;

        state.sequences.insert(account.clone(), expected + 1);

        let tx = transaction_reference(digest, account, sequence);
        state.transactions.insert(
            tx.clone(),
            TxEntry {
                digest: *digest,
                signature: *signature,
                account: account.clone(),
                status: AnchorStatus::Pending,
                confirm_at: now + self.confirmation_delay,
            },
        );

        tracing::debug!(
            digest = %digest,
            tx = %tx,
            account = %account,
            sequence,
            "In-process anchor accepted"
        );

        Ok(tx)
    }
}

impl Default for InProcessLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a deterministic, well-formed transaction reference.
fn transaction_reference(digest: &Digest, account: &AccountId, sequence: u64) -> TxRef {
    let mut material = Vec::with_capacity(digest.as_bytes().len() + 64 + 8);
    material.extend_from_slice(digest.as_bytes());
    material.extend_from_slice(account.as_str().as_bytes());
    material.extend_from_slice(&sequence.to_le_bytes());
    TxRef::new(format!("0x{}", digest_bytes(&material).to_hex()))
}

#[async_trait]
impl LedgerClient for InProcessLedger {
    async fn anchor(
        &self,
        digest: &Digest,
        signature: &Signature,
        account: &AccountId,
    ) -> LedgerResult<AnchorReceipt> {
        // Sequence assignment and submission happen under one state lock,
        // so concurrent anchors through this client cannot race.
        let mut state = self.state.lock().await;
        let sequence = state.sequences.get(account).copied().unwrap_or(0);
        let tx = self.submit_locked(&mut state, digest, signature, account, sequence)?;

        Ok(AnchorReceipt {
            digest: *digest,
            signature: *signature,
            tx,
            status: AnchorStatus::Pending,
        })
    }

    async fn await_confirmation(&self, tx: &TxRef, timeout: Duration) -> AnchorStatus {
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            let observed = {
                let mut state = self.state.lock().await;
                state.apply_settled(now);
                state
                    .transactions
                    .get(tx)
                    .map(|entry| (entry.status, entry.confirm_at))
            };

            let confirm_at = match observed {
                Some((status, _)) if status.is_settled() => return status,
                Some((_, confirm_at)) => confirm_at,
                None => {
                    tracing::warn!(tx = %tx, "Awaiting confirmation of unknown transaction");
                    return AnchorStatus::Pending;
                }
            };

            if now >= deadline {
                return AnchorStatus::Pending;
            }
            tokio::time::sleep_until(confirm_at.min(deadline)).await;
        }
    }

    async fn transaction_status(&self, tx: &TxRef) -> LedgerResult<AnchorStatus> {
        let mut state = self.state.lock().await;
        state.apply_settled(Instant::now());
        state
            .transactions
            .get(tx)
            .map(|entry| entry.status)
            .ok_or_else(|| LedgerError::rejected(format!("unknown transaction: {}", tx)))
    }

    async fn verify_file(&self, digest: &Digest) -> LedgerResult<Option<AccountId>> {
        let mut state = self.state.lock().await;
        state.apply_settled(Instant::now());
        Ok(state.records.get(digest).map(|record| record.owner.clone()))
    }

    async fn get_file_details(
        &self,
        digest: &Digest,
    ) -> LedgerResult<Option<(AccountId, Signature)>> {
        let mut state = self.state.lock().await;
        state.apply_settled(Instant::now());
        Ok(state
            .records
            .get(digest)
            .map(|record| (record.owner.clone(), record.signature)))
    }
}
