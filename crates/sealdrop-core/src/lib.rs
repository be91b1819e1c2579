//! Sealdrop Core Library
//!
//! This crate provides the domain types, content digest primitives, and
//! configuration that are shared across all Sealdrop components.

pub mod config;
pub mod digest;
pub mod types;

// Re-export commonly used types
pub use config::{Config, IndexBackend, LedgerBackend, StorageBackend};
pub use digest::{digest_bytes, Digest, DigestError, DigestHasher};
pub use types::{
    AccountId, AnchorReceipt, AnchorStatus, FileRecord, ObjectLocator, Signature, TxRef,
    VerificationResult,
};
