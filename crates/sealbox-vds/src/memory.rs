//! In-memory data store. Useful for testing and single-node
//! deployments; not durable.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sealbox_model::{Error, Result};

use crate::{DataStore, DataStoreEntry};

#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    entries: Mutex<HashMap<String, DataStoreEntry>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn create(&self, entry: &DataStoreEntry) -> Result<()> {
        let mut entries = self.entries.lock().expect("data store lock poisoned");

        if entries.contains_key(&entry.id) {
            return Err(Error::AlreadyExists);
        }

        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn read(&self, entry_id: &str) -> Result<DataStoreEntry> {
        let entries = self.entries.lock().expect("data store lock poisoned");
        entries.get(entry_id).cloned().ok_or(Error::NotFound)
    }

    async fn delete(&self, entry_id: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("data store lock poisoned");
        entries.remove(entry_id).map(|_| ()).ok_or(Error::NotFound)
    }

    async fn search_child_entries(&self, parent_id: &str) -> Result<Vec<DataStoreEntry>> {
        let prefix = if parent_id.ends_with('/') {
            parent_id.to_string()
        } else {
            format!("{parent_id}/")
        };

        let entries = self.entries.lock().expect("data store lock poisoned");
        let children = entries
            .values()
            .filter(|entry| {
                entry
                    .id
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .cloned()
            .collect();

        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> DataStoreEntry {
        DataStoreEntry { id: id.to_string(), data: vec![1, 2, 3], meta_data: "{}".to_string() }
    }

    #[tokio::test]
    async fn test_create_read_delete() {
        let store = InMemoryDataStore::new();

        store.create(&entry("/a")).await.unwrap();
        assert_eq!(store.read("/a").await.unwrap(), entry("/a"));

        store.delete("/a").await.unwrap();
        assert_eq!(store.read("/a").await, Err(Error::NotFound));
        assert_eq!(store.delete("/a").await, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn test_create_is_exclusive() {
        let store = InMemoryDataStore::new();

        store.create(&entry("/a")).await.unwrap();
        assert_eq!(store.create(&entry("/a")).await, Err(Error::AlreadyExists));
    }

    #[tokio::test]
    async fn test_search_immediate_children_only() {
        let store = InMemoryDataStore::new();

        for id in ["/ns", "/ns/0", "/ns/1", "/ns/2", "/ns/1/deep", "/other"] {
            store.create(&entry(id)).await.unwrap();
        }

        let mut children: Vec<String> = store
            .search_child_entries("/ns")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        children.sort();

        assert_eq!(children, vec!["/ns/0", "/ns/1", "/ns/2"]);
    }

    #[tokio::test]
    async fn test_search_children_of_root() {
        let store = InMemoryDataStore::new();

        for id in ["/", "/a", "/b", "/a/c"] {
            store.create(&entry(id)).await.unwrap();
        }

        let mut children: Vec<String> = store
            .search_child_entries("/")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        children.sort();

        assert_eq!(children, vec!["/a", "/b"]);
    }
}
