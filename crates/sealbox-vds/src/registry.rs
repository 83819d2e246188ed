//! Registry of data store types, mapping a configured type name to a
//! factory. Built explicitly during bootstrap; no process-wide mutable
//! state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use sealbox_model::{Error, Result};

use crate::{DataStore, InMemoryDataStore};

pub const IN_MEMORY_DATA_STORE_TYPE: &str = "InMemoryDataStore";

type DataStoreFactory = Box<dyn Fn(Option<&Path>) -> Result<Arc<dyn DataStore>> + Send + Sync>;

#[derive(Default)]
pub struct DataStoreRegistry {
    factories: HashMap<String, DataStoreFactory>,
}

impl DataStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in data store types.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();

        registry
            .register(
                IN_MEMORY_DATA_STORE_TYPE,
                Box::new(|_| Ok(Arc::new(InMemoryDataStore::new()))),
            )
            .expect("registry is empty");

        registry
    }

    pub fn register(&mut self, store_type: &str, factory: DataStoreFactory) -> Result<()> {
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
    pub fn create(&self, store_type: &str, location: Option<&Path>) -> Result<Arc<dyn DataStore>> {
        let factory = self.factories.get(store_type).ok_or_else(|| {
            Error::BadConfig(format!("unknown data store type: {store_type}"))
        })?;
        factory(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types_registered() {
        let registry = DataStoreRegistry::with_builtin_types();
        assert!(registry.registered(IN_MEMORY_DATA_STORE_TYPE));
        assert!(!registry.registered("NoSuchStore"));
    }

    #[test]
    fn test_unknown_type_is_bad_config() {
        let registry = DataStoreRegistry::with_builtin_types();
        assert!(matches!(registry.create("NoSuchStore", None), Err(Error::BadConfig(_))));
    }
}
