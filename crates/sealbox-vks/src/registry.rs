//! Registry of key store types, mapping a configured type name to a
//! factory. The registry is built explicitly during bootstrap and
//! passed where needed; there is no process-wide mutable state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use sealbox_model::{Error, Result};

use crate::{FileKeyStore, InMemoryKeyStore, KeyStore};

pub const IN_MEMORY_KEY_STORE_TYPE: &str = "InMemoryKeyStore";
pub const FILE_KEY_STORE_TYPE: &str = "FileKeyStore";

type KeyStoreFactory = Box<dyn Fn(Option<&Path>) -> Result<Arc<dyn KeyStore>> + Send + Sync>;

#[derive(Default)]
pub struct KeyStoreRegistry {
    factories: HashMap<String, KeyStoreFactory>,
}

impl KeyStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in key store types.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();

        registry
            .register(IN_MEMORY_KEY_STORE_TYPE, Box::new(|_| Ok(Arc::new(InMemoryKeyStore::new()))))
            .expect("registry is empty");

        registry
            .register(
                FILE_KEY_STORE_TYPE,
                Box::new(|location| {
                    let location = location.ok_or_else(|| {
                        Error::BadConfig("file key store requires a location".to_string())
                    })?;
                    Ok(Arc::new(FileKeyStore::open(location)?))
                }),
            )
            .expect("type registered twice");

        registry
    }

    pub fn register(&mut self, store_type: &str, factory: KeyStoreFactory) -> Result<()> {
        if self.factories.contains_key(store_type) {
            return Err(Error::AlreadyExists);
        }
        self.factories.insert(store_type.to_string(), factory);
        Ok(())
    }

    pub fn registered(&self, store_type: &str) -> bool {
        self.factories.contains_key(store_type)
    }

    /// Build a new store instance of the given type.
    pub fn create(&self, store_type: &str, location: Option<&Path>) -> Result<Arc<dyn KeyStore>> {
        let factory = self.factories.get(store_type).ok_or_else(|| {
            Error::BadConfig(format!("unknown key store type: {store_type}"))
        })?;
        factory(location)
    }
}
