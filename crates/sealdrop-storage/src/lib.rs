//! Sealdrop Storage Library
//!
//! This crate provides the object store abstraction and its backends: a
//! remote drive over HTTP, the local filesystem, and an in-memory store for
//! dev mode and tests.
//!
//! # Object key format
//!
//! The local and memory backends key objects as `drops/{uuid}-{filename}`,
//! with the filename reduced to its sanitized basename. The drive backend
//! uses the opaque id the drive assigns. Keys must not contain `..` or a
//! leading `/`. Key generation is centralized in the `keys` module so the
//! backends stay consistent.

pub mod drive;
pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use drive::DriveStore;
pub use factory::create_store;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use sealdrop_core::StorageBackend;
pub use traits::{ObjectStore, StorageError, StorageResult, StoredObject};
