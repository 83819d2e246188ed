//! The virtual key store: composes `n` independent key store backends
//! into one logical store using `(n, k)` secret sharing.
//!
//! Confidentiality survives any `k - 1` compromised backends;
//! availability survives any `n - k` unavailable ones.

pub mod file;
pub mod memory;
pub mod registry;
pub mod virtual_key_store;

pub use file::FileKeyStore;
pub use memory::InMemoryKeyStore;
pub use registry::KeyStoreRegistry;
pub use virtual_key_store::VirtualKeyStore;

use async_trait::async_trait;
use sealbox_model::Result;

/// Per-alias byte-blob store with creation exclusivity.
///
/// `read` must return a defensive copy; callers are permitted to
/// zeroize the returned bytes.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Store a blob under a new alias, `AlreadyExists` on duplicates.
    async fn create(&self, alias: &str, value: &[u8]) -> Result<()>;

    /// Read the blob stored under `alias`, `NotFound` if absent.
    async fn read(&self, alias: &str) -> Result<Vec<u8>>;

    /// Delete the blob stored under `alias`, `NotFound` if absent.
    async fn delete(&self, alias: &str) -> Result<()>;
}
