//! Configuration module
//!
//! This module provides runtime configuration for the pipeline: which storage,
//! ledger, and index backends to use, their connection settings, and the
//! timing knobs for anchor confirmation and reconciliation.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Object store backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Drive,
    Local,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drive" => Ok(StorageBackend::Drive),
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Drive => write!(f, "drive"),
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Ledger backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Rpc,
    InProcess,
}

impl FromStr for LedgerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rpc" => Ok(LedgerBackend::Rpc),
            "inprocess" | "in-process" => Ok(LedgerBackend::InProcess),
            _ => Err(anyhow::anyhow!("Invalid ledger backend: {}", s)),
        }
    }
}

impl Display for LedgerBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LedgerBackend::Rpc => write!(f, "rpc"),
            LedgerBackend::InProcess => write!(f, "inprocess"),
        }
    }
}

/// Metadata index backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Postgres,
    Memory,
}

impl FromStr for IndexBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(IndexBackend::Postgres),
            "memory" => Ok(IndexBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid index backend: {}", s)),
        }
    }
}

impl Display for IndexBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            IndexBackend::Postgres => write!(f, "postgres"),
            IndexBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Application configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    // Database configuration
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub index_backend: IndexBackend,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub drive_api_base: String,
    pub drive_folder_id: Option<String>,
    pub drive_access_token: Option<String>,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Ledger configuration
    pub ledger_backend: LedgerBackend,
    pub ledger_rpc_url: Option<String>,
    /// Hex-encoded 32-byte Ed25519 seed for the service signing identity.
    /// When absent outside production, an ephemeral key is generated.
    pub ledger_signer_seed: Option<String>,
    pub confirm_timeout_secs: u64,
    pub confirm_poll_interval_ms: u64,
    // Reconciliation configuration
    pub reconcile_interval_secs: u64,
    pub reconcile_batch_size: i64,
    // Upload limits
    pub max_file_size_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const MAX_FILE_SIZE_MB: usize = 25;
        const CONFIRM_TIMEOUT_SECS: u64 = 90;
        const CONFIRM_POLL_INTERVAL_MS: u64 = 1500;
        const RECONCILE_INTERVAL_SECS: u64 = 60;
        const RECONCILE_BATCH_SIZE: i64 = 50;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let ledger_backend = env::var("LEDGER_BACKEND")
            .unwrap_or_else(|_| "inprocess".to_string())
            .parse::<LedgerBackend>()?;

        let index_backend = env::var("INDEX_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse::<IndexBackend>()?;

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            index_backend,
            storage_backend,
            drive_api_base: env::var("DRIVE_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com".to_string()),
            drive_folder_id: env::var("DRIVE_FOLDER_ID").ok(),
            drive_access_token: env::var("DRIVE_ACCESS_TOKEN").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./data/objects".to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:4000/files".to_string()),
            ledger_backend,
            ledger_rpc_url: env::var("LEDGER_RPC_URL").ok(),
            ledger_signer_seed: env::var("LEDGER_SIGNER_SEED").ok(),
            confirm_timeout_secs: env::var("CONFIRM_TIMEOUT_SECS")
                .unwrap_or_else(|_| CONFIRM_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONFIRM_TIMEOUT_SECS),
            confirm_poll_interval_ms: env::var("CONFIRM_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| CONFIRM_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(CONFIRM_POLL_INTERVAL_MS),
            reconcile_interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .unwrap_or_else(|_| RECONCILE_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(RECONCILE_INTERVAL_SECS),
            reconcile_batch_size: env::var("RECONCILE_BATCH_SIZE")
                .unwrap_or_else(|_| RECONCILE_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(RECONCILE_BATCH_SIZE),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::Drive => {
                if self.drive_folder_id.is_none() {
                    return Err(anyhow::anyhow!(
                        "DRIVE_FOLDER_ID must be set when STORAGE_BACKEND=drive"
                    ));
                }
                if self.drive_access_token.is_none() {
                    return Err(anyhow::anyhow!(
                        "DRIVE_ACCESS_TOKEN must be set when STORAGE_BACKEND=drive"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!("LOCAL_STORAGE_PATH cannot be empty"));
                }
                if self.local_storage_base_url.trim().is_empty() {
                    return Err(anyhow::anyhow!("LOCAL_STORAGE_BASE_URL cannot be empty"));
                }
            }
            StorageBackend::Memory => {}
        }

        if self.ledger_backend == LedgerBackend::Rpc && self.ledger_rpc_url.is_none() {
            return Err(anyhow::anyhow!(
                "LEDGER_RPC_URL must be set when LEDGER_BACKEND=rpc"
            ));
        }

        if self.index_backend == IndexBackend::Postgres && self.database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be set when INDEX_BACKEND=postgres"
            ));
        }

        if self.is_production() && self.ledger_signer_seed.is_none() {
            return Err(anyhow::anyhow!(
                "LEDGER_SIGNER_SEED must be set in production. Anchors from an ephemeral key cannot be re-verified after restart."
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.confirm_poll_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "CONFIRM_POLL_INTERVAL_MS must be greater than 0"
            ));
        }
        if self.reconcile_batch_size <= 0 {
            return Err(anyhow::anyhow!(
                "RECONCILE_BATCH_SIZE must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "development".to_string(),
            database_url: Some("postgres://localhost/sealdrop".to_string()),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            index_backend: IndexBackend::Postgres,
            storage_backend: StorageBackend::Local,
            drive_api_base: "https://www.googleapis.com".to_string(),
            drive_folder_id: None,
            drive_access_token: None,
            local_storage_path: "./data/objects".to_string(),
            local_storage_base_url: "http://localhost:4000/files".to_string(),
            ledger_backend: LedgerBackend::InProcess,
            ledger_rpc_url: None,
            ledger_signer_seed: None,
            confirm_timeout_secs: 90,
            confirm_poll_interval_ms: 1500,
            reconcile_interval_secs: 60,
            reconcile_batch_size: 50,
            max_file_size_bytes: 25 * 1024 * 1024,
        }
    }

    #[test]
    fn valid_development_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn drive_backend_requires_folder_and_token() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Drive;
        assert!(config.validate().is_err());

        config.drive_folder_id = Some("folder-123".to_string());
        assert!(config.validate().is_err());

        config.drive_access_token = Some("token".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rpc_ledger_requires_url() {
        let mut config = base_config();
        config.ledger_backend = LedgerBackend::Rpc;
        assert!(config.validate().is_err());

        config.ledger_rpc_url = Some("http://localhost:8545".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn postgres_index_requires_database_url() {
        let mut config = base_config();
        config.database_url = None;
        assert!(config.validate().is_err());

        config.index_backend = IndexBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_requires_signer_seed() {
        let mut config = base_config();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.ledger_signer_seed = Some("ab".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!(
            "Drive".parse::<StorageBackend>().unwrap(),
            StorageBackend::Drive
        );
        assert_eq!(
            "in-process".parse::<LedgerBackend>().unwrap(),
            LedgerBackend::InProcess
        );
        assert_eq!(
            "MEMORY".parse::<IndexBackend>().unwrap(),
            IndexBackend::Memory
        );
        assert!("nfs".parse::<StorageBackend>().is_err());
    }
}
