//! The secret engine: envelope-encrypted CRUD of typed secrets.
//!
//! Each supported type is a [`SecretType`] handler registered in a
//! [`SecretTypeRegistry`] built at bootstrap. All handlers follow the
//! same envelope: generate a fresh data key, encrypt the payload,
//! write the ciphertext to the data store and the key to the virtual
//! key store under the secret's canonical path. The data-store write
//! precedes the key-store write so a stray key entry can never outlive
//! a failed data-store create; the reverse race (a row whose key never
//! landed) is tolerated and surfaces as an internal error on read.

mod data;
mod rsa_key;
mod x509;

pub use data::DataSecretType;
pub use rsa_key::RsaPrivateKeySecretType;
pub use x509::X509CertificateSecretType;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sealbox_model::{validate, Error, RequestContext, Result, SecretEntry};
use sealbox_vds::{codec, DataStore};
use sealbox_vks::VirtualKeyStore;
use tracing::info;
use uuid::Uuid;

/// Per-type create/get/delete behavior.
#[async_trait]
pub trait SecretType: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Validate and persist a new secret, returning its id.
    async fn create_secret(&self, ctx: &RequestContext, entry: &SecretEntry) -> Result<String>;

    /// Decrypt the payload of an entry already read from the data
    /// store and return it with plaintext `secret_data`.
    async fn get_secret(&self, ctx: &RequestContext, entry: SecretEntry) -> Result<SecretEntry>;

    /// Remove the data-store record and the enveloped key.
    async fn delete_secret(&self, ctx: &RequestContext, entry: &SecretEntry) -> Result<()>;
}

/// Maps type names to handlers. Built explicitly at bootstrap; there is
/// no process-wide registrar.
#[derive(Default)]
pub struct SecretTypeRegistry {
    types: HashMap<String, Arc<dyn SecretType>>,
}

impl SecretTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, secret_type: Arc<dyn SecretType>) -> Result<()> {
        let name = secret_type.type_name().to_string();
        if self.types.contains_key(&name) {
            return Err(Error::AlreadyExists);
        }
        self.types.insert(name, secret_type);
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Result<Arc<dyn SecretType>> {
        self.types.get(type_name).cloned().ok_or(Error::NotFound)
    }
}

/// Dispatches secret operations to the registered type handlers.
pub struct SecretManager {
    data_store: Arc<dyn DataStore>,
    registry: SecretTypeRegistry,
}

impl SecretManager {
    pub fn new(data_store: Arc<dyn DataStore>, registry: SecretTypeRegistry) -> Self {
        Self { data_store, registry }
    }

    /// The standard registry with the built-in secret types.
    pub fn with_builtin_types(
        data_store: Arc<dyn DataStore>,
        key_store: Arc<VirtualKeyStore>,
    ) -> Self {
        let mut registry = SecretTypeRegistry::new();
        registry
            .register(Arc::new(DataSecretType::new(data_store.clone(), key_store.clone())))
            .expect("registry is empty");
        registry
            .register(Arc::new(RsaPrivateKeySecretType::new(
                data_store.clone(),
                key_store.clone(),
            )))
            .expect("type registered twice");
        registry
            .register(Arc::new(X509CertificateSecretType::new(
                data_store.clone(),
                key_store,
            )))
            .expect("type registered twice");

        Self::new(data_store, registry)
    }

    pub async fn create_secret(&self, ctx: &RequestContext, entry: &SecretEntry) -> Result<String> {
        validate::validate_secret_entry(entry)?;

        let mut entry = entry.clone();
        if entry.id.is_empty() {
            entry.id = Uuid::new_v4().to_string();
        }

        let handler =
            self.registry.get(&entry.secret_type).map_err(|_| Error::InputValidation)?;
        let id = handler.create_secret(ctx, &entry).await?;

        info!(id = %id, secret_type = %entry.secret_type, "secret created");

        Ok(id)
    }

    pub async fn get_secret(&self, ctx: &RequestContext, secret_id: &str) -> Result<SecretEntry> {
        let path = codec::secret_id_to_path(secret_id);
        let data_store_entry = self.data_store.read(&path).await?;
        let entry = codec::data_store_entry_to_secret_entry(&data_store_entry)?;

        let handler = self.registry.get(&entry.secret_type).map_err(|_| Error::Internal)?;
        handler.get_secret(ctx, entry).await
    }

    pub async fn delete_secret(&self, ctx: &RequestContext, secret_id: &str) -> Result<()> {
        let path = codec::secret_id_to_path(secret_id);
        let data_store_entry = self.data_store.read(&path).await?;
        let entry = codec::data_store_entry_to_secret_entry(&data_store_entry)?;

        let handler = self.registry.get(&entry.secret_type).map_err(|_| Error::Internal)?;
        handler.delete_secret(ctx, &entry).await?;

        info!(id = %secret_id, "secret deleted");

        Ok(())
    }
}

/// Shared create tail: fresh data key, encrypt, data-store row, then
/// the enveloped key. The key buffer zeroes itself on every exit.
pub(crate) async fn store_envelope(
    data_store: &Arc<dyn DataStore>,
    key_store: &Arc<VirtualKeyStore>,
    entry: &SecretEntry,
    payload: &[u8],
) -> Result<()> {
    let secret_path = codec::secret_id_to_path(&entry.id);

    let key = sealbox_crypto::generate_key();
    let ciphertext = sealbox_crypto::encrypt(payload, &key).map_err(|_| Error::Internal)?;

    let mut stored = entry.clone();
    stored.secret_data = ciphertext;

    let data_store_entry = codec::secret_entry_to_data_store_entry(&stored)?;
    data_store.create(&data_store_entry).await?;

    key_store.create(&secret_path, &key).await
}

/// Shared get tail: read the enveloped key and decrypt the stored
/// payload in place.
pub(crate) async fn open_envelope(
    key_store: &Arc<VirtualKeyStore>,
    mut entry: SecretEntry,
) -> Result<SecretEntry> {
    let secret_path = codec::secret_id_to_path(&entry.id);

    let key = key_store.read(&secret_path).await?;
    let plaintext =
        sealbox_crypto::decrypt(&entry.secret_data, &key).map_err(|_| Error::Internal)?;

    entry.secret_data = plaintext;
    Ok(entry)
}

/// Shared delete tail: the data-store row first, then the shares. A
/// failure after the first step leaves an orphan share set whose data
/// is already gone.
pub(crate) async fn discard_envelope(
    data_store: &Arc<dyn DataStore>,
    key_store: &Arc<VirtualKeyStore>,
    entry: &SecretEntry,
) -> Result<()> {
    let secret_path = codec::secret_id_to_path(&entry.id);

    data_store.delete(&secret_path).await?;
    key_store.delete(&secret_path).await
}

/// Reject a create for an id the data store already has.
pub(crate) async fn reject_existing(data_store: &Arc<dyn DataStore>, path: &str) -> Result<()> {
    match data_store.read(path).await {
        Ok(_) => Err(Error::AlreadyExists),
        Err(_) => Ok(()),
    }
}
