//! The virtual data store: a keyed hierarchical store of opaque
//! `(id, data, metadata)` records with immediate-child lookup, plus the
//! codec that maps domain entities onto those records.
//!
//! Concrete backends implement [`DataStore`]; the core consumes only
//! the contract. Mutual exclusion at entry granularity is the
//! backend's responsibility.

pub mod codec;
pub mod memory;
pub mod registry;

pub use memory::InMemoryDataStore;
pub use registry::DataStoreRegistry;

use async_trait::async_trait;
use sealbox_model::Result;

/// One persisted record. `meta_data` is a serialized [`codec::MetaData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStoreEntry {
    pub id: String,
    pub data: Vec<u8>,
    pub meta_data: String,
}

/// Contract consumed by the core.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert a new entry. Must reject an existing id atomically with
    /// `AlreadyExists`.
    async fn create(&self, entry: &DataStoreEntry) -> Result<()>;

    /// Read an entry by id, `NotFound` if absent.
    async fn read(&self, entry_id: &str) -> Result<DataStoreEntry>;

    /// Delete an entry by id, `NotFound` if absent.
    async fn delete(&self, entry_id: &str) -> Result<()>;

    /// Entries whose ids are immediate children of `parent_id` under
    /// the `/` separator. Ordering is unspecified.
    async fn search_child_entries(&self, parent_id: &str) -> Result<Vec<DataStoreEntry>>;
}
