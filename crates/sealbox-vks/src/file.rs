//! File-backed key store: one blob file per alias under a root
//! directory. Durable enough for single-node deployments; creation
//! exclusivity comes from `O_EXCL`.

use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use sealbox_model::{Error, Result};

use crate::KeyStore;

pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    /// Open (and create if needed) the backing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|err| Error::BadConfig(format!("cannot create {}: {err}", root.display())))?;
        Ok(Self { root })
    }

    /// Aliases are hierarchical paths; hex-encode them into flat file
    /// names.
    fn blob_path(&self, alias: &str) -> PathBuf {
        self.root.join(hex::encode(alias))
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn create(&self, alias: &str, value: &[u8]) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.blob_path(alias))
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => Error::AlreadyExists,
                _ => Error::Internal,
            })?;

        file.write_all(value).map_err(|_| Error::Internal)
    }

    async fn read(&self, alias: &str) -> Result<Vec<u8>> {
        std::fs::read(self.blob_path(alias)).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound,
            _ => Error::Internal,
        })
    }

    async fn delete(&self, alias: &str) -> Result<()> {
        std::fs::remove_file(self.blob_path(alias)).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound,
            _ => Error::Internal,
        })
    }
}
