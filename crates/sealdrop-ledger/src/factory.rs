use anyhow::{Context, Result};
use sealdrop_core::{Config, LedgerBackend};
use std::sync::Arc;

use crate::client::LedgerClient;
use crate::inprocess::InProcessLedger;
use crate::rpc::RpcLedger;
use crate::signer::{Ed25519Signer, Signer};

/// Create a ledger client based on configuration
pub fn create_ledger(config: &Config) -> Result<Arc<dyn LedgerClient>> {
    match config.ledger_backend {
        LedgerBackend::Rpc => {
            let endpoint = config
                .ledger_rpc_url
                .clone()
                .context("LEDGER_RPC_URL not configured")?;
            let ledger = RpcLedger::new(endpoint, config.confirm_poll_interval())?;
            Ok(Arc::new(ledger))
        }
        LedgerBackend::InProcess => Ok(Arc::new(InProcessLedger::new())),
    }
}

/// Create the service signing identity based on configuration
///
/// Without a configured seed an ephemeral key is generated; config
/// validation rejects that in production since its anchors could not be
/// re-verified after a restart.
pub fn create_signer(config: &Config) -> Result<Arc<dyn Signer>> {
    match &config.ledger_signer_seed {
        Some(seed) => {
            let signer = Ed25519Signer::from_seed_hex(seed).context("Invalid LEDGER_SIGNER_SEED")?;
            Ok(Arc::new(signer))
        }
        None => {
            let signer = Ed25519Signer::generate();
            tracing::warn!(
                account = %signer.account(),
                "LEDGER_SIGNER_SEED not set, generated an ephemeral signing identity"
            );
            Ok(Arc::new(signer))
        }
    }
}
