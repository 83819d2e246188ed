//! Namespace lifecycle: creation requires an existing parent, deletion
//! requires no children, and the built-in namespaces `/`, `/users` and
//! `/secrets` are created on first run.

use std::sync::Arc;

use sealbox_model::{validate, Error, NamespaceEntry, Result};
use sealbox_vds::{codec, DataStore};
use tracing::info;

const BUILTIN_NAMESPACES: [&str; 3] = ["/", "/users", "/secrets"];

pub struct NamespaceManager {
    data_store: Arc<dyn DataStore>,
}

impl NamespaceManager {
    pub fn new(data_store: Arc<dyn DataStore>) -> Self {
        Self { data_store }
    }

    /// First-run bootstrap of the built-in namespaces.
    pub async fn init(&self) -> Result<()> {
        for path in BUILTIN_NAMESPACES {
            if self.get_namespace(path).await.is_ok() {
                continue;
            }

            let entry = NamespaceEntry {
                path: path.to_string(),
                owner: "root".to_string(),
                role_labels: Vec::new(),
                child_paths: Vec::new(),
            };
            self.create_namespace(&entry).await?;
        }

        Ok(())
    }

    pub async fn create_namespace(&self, entry: &NamespaceEntry) -> Result<String> {
        validate::validate_namespace_entry(entry)?;

        if self.data_store.read(&entry.path).await.is_ok() {
            return Err(Error::AlreadyExists);
        }

        if entry.path != "/" {
            let parent = codec::parent_path(&entry.path);
            self.data_store.read(parent).await.map_err(|_| Error::InputValidation)?;
        }

        let data_store_entry = codec::namespace_entry_to_data_store_entry(entry)?;
        self.data_store.create(&data_store_entry).await?;

        info!(path = %entry.path, "namespace created");

        Ok(entry.path.clone())
    }

    pub async fn get_namespace(&self, path: &str) -> Result<NamespaceEntry> {
        let data_store_entry = self.data_store.read(path).await?;
        let mut entry = codec::data_store_entry_to_namespace_entry(&data_store_entry)?;

        let children = self.data_store.search_child_entries(path).await?;
        entry.child_paths = codec::entries_to_paths(&children);

        Ok(entry)
    }

    /// Delete a namespace. Refused while any child entry exists, which
    /// also keeps the built-in namespaces alive.
    pub async fn delete_namespace(&self, path: &str) -> Result<()> {
        let children = self.data_store.search_child_entries(path).await?;
        if !children.is_empty() {
            return Err(Error::InputValidation);
        }

        self.data_store.delete(path).await?;

        info!(path = %path, "namespace deleted");

        Ok(())
    }
}
