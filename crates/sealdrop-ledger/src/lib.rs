//! Sealdrop Ledger Library
//!
//! This crate provides anchor signing and the ledger client abstraction with
//! its two backends: a JSON-RPC gateway client for a real ledger, and an
//! in-process ledger implementing the contract semantics for dev mode and
//! tests.

pub mod client;
pub mod factory;
pub mod inprocess;
pub mod rpc;
pub mod signer;

// Re-export commonly used types
pub use client::{LedgerClient, LedgerError, LedgerErrorKind, LedgerResult};
pub use factory::{create_ledger, create_signer};
pub use inprocess::InProcessLedger;
pub use rpc::RpcLedger;
pub use signer::{verify_signature, Ed25519Signer, Signer, SigningError};
