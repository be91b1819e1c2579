//! Sealdrop Metadata Index
//!
//! Maps human-facing file names to stored objects and their ledger
//! anchors. A record is inserted as soon as the object store accepts
//! the bytes; the anchor receipt is attached afterwards, so a record
//! without a receipt marks an upload whose anchoring never completed.
//!
//! Two backends implement [`MetadataIndex`]: Postgres for deployments
//! and an in-memory index for tests.

pub mod factory;
pub mod memory;
pub mod pg;
pub mod records;
pub mod setup;
pub mod traits;

pub use factory::create_index;
pub use memory::MemoryIndex;
pub use pg::PgIndex;
pub use setup::setup_database;
pub use traits::{IndexError, IndexResult, MetadataIndex};
