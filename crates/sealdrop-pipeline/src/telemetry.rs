//! Tracing initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,sealdrop_core=debug,sealdrop_storage=debug,\
                              sealdrop_ledger=debug,sealdrop_index=debug,sealdrop_pipeline=debug";

/// Initialize tracing with an env-controlled filter.
///
/// Honors `RUST_LOG` when set and falls back to debug-level output for the
/// sealdrop crates. Fails when a global subscriber is already installed.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}
