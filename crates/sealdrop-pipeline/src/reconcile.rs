//! Anchor reconciliation sweep
//!
//! Uploads whose confirmation window expired leave records with a Pending
//! receipt in the index. The reconciler periodically re-polls the ledger for
//! those transactions and writes settled statuses back, so the index
//! eventually agrees with the chain without any upload waiting around for
//! it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use sealdrop_core::AnchorStatus;
use sealdrop_index::{IndexResult, MetadataIndex};
use sealdrop_ledger::LedgerClient;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Maximum number of pending records examined per sweep.
    pub batch_size: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            batch_size: 50,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_config(config: &sealdrop_core::Config) -> Self {
        Self {
            interval: config.reconcile_interval(),
            batch_size: config.reconcile_batch_size,
        }
    }
}

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub examined: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub still_pending: usize,
}

/// Interval sweep over records with unsettled anchors.
#[derive(Clone)]
pub struct AnchorReconciler {
    index: Arc<dyn MetadataIndex>,
    ledger: Arc<dyn LedgerClient>,
    config: ReconcilerConfig,
}

impl AnchorReconciler {
    pub fn new(
        index: Arc<dyn MetadataIndex>,
        ledger: Arc<dyn LedgerClient>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            index,
            ledger,
            config,
        }
    }

    /// Run a single sweep.
    ///
    /// Poll failures leave the record pending for the next sweep; only the
    /// batch query itself can fail the sweep.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> IndexResult<ReconcileSummary> {
        let pending = self
            .index
            .list_pending_anchors(self.config.batch_size)
            .await?;
        let mut summary = ReconcileSummary {
            examined: pending.len(),
            ..ReconcileSummary::default()
        };

        for record in &pending {
            let tx = match record.tx_ref() {
                Some(tx) => tx,
                None => {
                    tracing::error!(
                        record_id = %record.id,
                        "Pending anchor record carries no transaction reference"
                    );
                    continue;
                }
            };

            match self.ledger.transaction_status(tx).await {
                Ok(status) if status.is_settled() => {
                    match self.index.update_anchor_status(record.id, status).await {
                        Ok(()) => {
                            tracing::info!(
                                record_id = %record.id,
                                tx = %tx,
                                status = %status,
                                "Anchor settled"
                            );
                            match status {
                                AnchorStatus::Confirmed => summary.confirmed += 1,
                                AnchorStatus::Failed => summary.failed += 1,
                                AnchorStatus::Pending => {}
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                record_id = %record.id,
                                "Failed to write settled anchor status"
                            );
                            summary.still_pending += 1;
                        }
                    }
                }
                Ok(_) => {
                    summary.still_pending += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        record_id = %record.id,
                        tx = %tx,
                        "Anchor status poll failed, leaving record pending"
                    );
                    summary.still_pending += 1;
                }
            }
        }

        if summary.examined > 0 {
            tracing::info!(
                examined = summary.examined,
                confirmed = summary.confirmed,
                failed = summary.failed,
                still_pending = summary.still_pending,
                "Anchor reconciliation sweep completed"
            );
        }

        Ok(summary)
    }

    /// Start the background sweep loop.
    ///
    /// The first sweep runs immediately, then one per configured interval.
    pub fn start(self) -> ReconcilerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.config.interval.as_secs(),
                batch_size = self.config.batch_size,
                "Anchor reconciler started"
            );

            let mut sweep = tokio::time::interval(self.config.interval);
            sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = sweep.tick() => {
                        if let Err(e) = self.run_once().await {
                            tracing::error!(error = %e, "Anchor reconciliation sweep failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Anchor reconciler shutting down");
                        break;
                    }
                }
            }
        });

        ReconcilerHandle { shutdown_tx, task }
    }
}

/// Handle for stopping a running reconciler.
pub struct ReconcilerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Signal shutdown and wait for the sweep loop to exit. A sweep already
    /// in flight finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}
