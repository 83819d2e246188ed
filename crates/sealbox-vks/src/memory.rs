//! In-memory key store backend. Useful for testing and single-node
//! deployments; not durable.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sealbox_model::{Error, Result};

use crate::KeyStore;

#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn create(&self, alias: &str, value: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.lock().expect("key store lock poisoned");

        if blobs.contains_key(alias) {
            return Err(Error::AlreadyExists);
        }

        blobs.insert(alias.to_string(), value.to_vec());
        Ok(())
    }

    async fn read(&self, alias: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.lock().expect("key store lock poisoned");
        blobs.get(alias).cloned().ok_or(Error::NotFound)
    }

    async fn delete(&self, alias: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().expect("key store lock poisoned");
        blobs.remove(alias).map(|_| ()).ok_or(Error::NotFound)
    }
}
