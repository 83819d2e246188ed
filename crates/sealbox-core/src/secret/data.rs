//! The data-only secret type: the payload is whatever the caller sent.

use std::sync::Arc;

use async_trait::async_trait;
use sealbox_model::{Error, RequestContext, Result, SecretEntry, SECRET_TYPE_DATA};
use sealbox_vds::{codec, DataStore};
use sealbox_vks::VirtualKeyStore;

use super::{discard_envelope, open_envelope, reject_existing, store_envelope, SecretType};

pub struct DataSecretType {
    data_store: Arc<dyn DataStore>,
    key_store: Arc<VirtualKeyStore>,
}

impl DataSecretType {
    pub fn new(data_store: Arc<dyn DataStore>, key_store: Arc<VirtualKeyStore>) -> Self {
        Self { data_store, key_store }
    }
}

#[async_trait]
impl SecretType for DataSecretType {
    fn type_name(&self) -> &'static str {
        SECRET_TYPE_DATA
    }

    async fn create_secret(&self, _ctx: &RequestContext, entry: &SecretEntry) -> Result<String> {
        if entry.secret_data.is_empty() {
            return Err(Error::InputValidation);
        }

        let secret_path = codec::secret_id_to_path(&entry.id);
        reject_existing(&self.data_store, &secret_path).await?;

        store_envelope(&self.data_store, &self.key_store, entry, &entry.secret_data).await?;

        Ok(entry.id.clone())
    }

    async fn get_secret(&self, _ctx: &RequestContext, entry: SecretEntry) -> Result<SecretEntry> {
        open_envelope(&self.key_store, entry).await
    }

    async fn delete_secret(&self, _ctx: &RequestContext, entry: &SecretEntry) -> Result<()> {
        discard_envelope(&self.data_store, &self.key_store, entry).await
    }
}
