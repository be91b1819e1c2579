//! JSON-RPC ledger gateway client
//!
//! Speaks JSON-RPC 2.0 to an anchor gateway that fronts the ledger. The
//! contract surface maps onto five methods: `anchor_getSequence`,
//! `anchor_storeFileHash`, `anchor_getTransaction`, `anchor_verifyFile`,
//! and `anchor_getFileDetails`. Transport problems and malformed gateway
//! answers surface as `Unreachable`; gateway error objects map onto
//! `InsufficientFunds` or `Rejected` by code.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;

use async_trait::async_trait;
use sealdrop_core::{AccountId, AnchorReceipt, AnchorStatus, Digest, Signature, TxRef};

use crate::client::{LedgerClient, LedgerError, LedgerResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gateway application error code for an account that cannot cover the fee.
const CODE_INSUFFICIENT_FUNDS: i64 = -32050;

#[derive(serde::Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct TransactionStatusResult {
    status: String,
}

#[derive(Deserialize)]
struct VerifyFileResult {
    exists: bool,
    owner: Option<String>,
}

#[derive(Deserialize)]
struct FileDetailsResult {
    owner: String,
    signature: String,
}

/// JSON-RPC gateway ledger client
pub struct RpcLedger {
    http: Client,
    endpoint: String,
    poll_interval: Duration,
    // Sequence fetch and submission are two wire calls; one in-flight
    // submission at a time keeps sequences strictly increasing.
    submit_lock: Mutex<()>,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(endpoint: impl Into<String>, poll_interval: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            poll_interval,
            submit_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> LedgerResult<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LedgerError::unreachable(format!(
                "gateway returned {}: {}",
                status, error_text
            )));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::unreachable(format!("invalid gateway response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(map_rpc_error(error));
        }

        body.result
            .ok_or_else(|| LedgerError::unreachable("gateway response carried no result".to_string()))
    }

    async fn fetch_sequence(&self, account: &AccountId) -> LedgerResult<u64> {
        self.call(
            "anchor_getSequence",
            serde_json::json!({ "account": account }),
        )
        .await
    }
}

fn map_rpc_error(error: RpcErrorBody) -> LedgerError {
    match error.code {
        CODE_INSUFFICIENT_FUNDS => LedgerError::insufficient_funds(error.message),
        _ => LedgerError::rejected(format!("code {}: {}", error.code, error.message)),
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn anchor(
        &self,
        digest: &Digest,
        signature: &Signature,
        account: &AccountId,
    ) -> LedgerResult<AnchorReceipt> {
        let _guard = self.submit_lock.lock().await;

        let sequence = self.fetch_sequence(account).await?;
        let tx_hash: String = self
            .call(
                "anchor_storeFileHash",
                serde_json::json!({
                    "digest": digest.to_hex(),
                    "signature": signature.to_hex(),
                    "account": account,
                    "sequence": sequence,
                }),
            )
            .await?;

        let tx = TxRef::new(tx_hash);
        tracing::info!(
            digest = %digest,
            tx = %tx,
            account = %account,
            sequence,
            "Anchor transaction submitted"
        );

        Ok(AnchorReceipt {
            digest: *digest,
            signature: *signature,
            tx,
            status: AnchorStatus::Pending,
        })
    }

    async fn await_confirmation(&self, tx: &TxRef, timeout: Duration) -> AnchorStatus {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut last_known = AnchorStatus::Pending;

        loop {
            match self.transaction_status(tx).await {
                Ok(status) if status.is_settled() => return status,
                Ok(status) => last_known = status,
                Err(e) => {
                    tracing::warn!(tx = %tx, error = %e, "Confirmation poll failed");
                }
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return last_known;
            }
            let wait = self.poll_interval.min(deadline.duration_since(now));
            tokio::time::sleep(wait).await;
        }
    }

    async fn transaction_status(&self, tx: &TxRef) -> LedgerResult<AnchorStatus> {
        let result: TransactionStatusResult = self
            .call("anchor_getTransaction", serde_json::json!({ "txRef": tx }))
            .await?;

        result.status.parse().map_err(|_| {
            LedgerError::rejected(format!("unknown transaction status: {}", result.status))
        })
    }

    async fn verify_file(&self, digest: &Digest) -> LedgerResult<Option<AccountId>> {
        let result: VerifyFileResult = self
            .call(
                "anchor_verifyFile",
                serde_json::json!({ "digest": digest.to_hex() }),
            )
            .await?;

        if !result.exists {
            return Ok(None);
        }

        let owner = result.owner.ok_or_else(|| {
            LedgerError::rejected("gateway reported an anchored digest without an owner".to_string())
        })?;
        let owner: AccountId = owner
            .parse()
            .map_err(|e| LedgerError::rejected(format!("malformed owner account: {}", e)))?;

        Ok(Some(owner))
    }

    async fn get_file_details(
        &self,
        digest: &Digest,
    ) -> LedgerResult<Option<(AccountId, Signature)>> {
        // The contract's detail lookup reverts for unknown digests, so
        // existence is checked first and absence is a clean None.
        if self.verify_file(digest).await?.is_none() {
            return Ok(None);
        }

        let result: FileDetailsResult = self
            .call(
                "anchor_getFileDetails",
                serde_json::json!({ "digest": digest.to_hex() }),
            )
            .await?;

        let owner: AccountId = result
            .owner
            .parse()
            .map_err(|e| LedgerError::rejected(format!("malformed owner account: {}", e)))?;
        let signature: Signature = result
            .signature
            .parse()
            .map_err(|e| LedgerError::rejected(format!("malformed stored signature: {}", e)))?;

        Ok(Some((owner, signature)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_codes_map_to_kinds() {
        let err = map_rpc_error(RpcErrorBody {
            code: CODE_INSUFFICIENT_FUNDS,
            message: "account balance too low".to_string(),
        });
        assert!(err.is_insufficient_funds());

        let err = map_rpc_error(RpcErrorBody {
            code: -32051,
            message: "bad sequence".to_string(),
        });
        assert_eq!(err.kind, crate::client::LedgerErrorKind::Rejected);
        assert!(err.message.contains("bad sequence"));
    }
}
