//! Application state: store construction, engine wiring and the
//! first-run bootstrap of the built-in namespaces and the `root`
//! principal.

use std::sync::Arc;

use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sealbox_core::{AuthnManager, AuthzManager, NamespaceManager, SecretManager};
use sealbox_crypto::SecretSharer;
use sealbox_model::{Error, Result, UserEntry};
use sealbox_vds::DataStoreRegistry;
use sealbox_vks::{KeyStore, KeyStoreRegistry, VirtualKeyStore};

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub namespaces: NamespaceManager,
    pub secrets: SecretManager,
    pub authn: AuthnManager,
    pub authz: AuthzManager,
}

impl AppState {
    /// Build the state from configuration, reading the root public key
    /// from the configured PEM file.
    pub async fn new(config: Config) -> Result<Self> {
        let path = config
            .root_public_key_path
            .clone()
            .ok_or_else(|| Error::BadConfig("ROOT_INIT_PUB_KEY is required".to_string()))?;

        let root_public_key_pem = std::fs::read(&path).map_err(|err| {
            Error::BadConfig(format!("cannot read root public key {}: {err}", path.display()))
        })?;

        Self::with_root_key(config, root_public_key_pem).await
    }

    /// Build the state with the root public key supplied directly.
    pub async fn with_root_key(config: Config, root_public_key_pem: Vec<u8>) -> Result<Self> {
        let pem = std::str::from_utf8(&root_public_key_pem)
            .map_err(|_| Error::BadConfig("root public key is not valid UTF-8".to_string()))?;
        RsaPublicKey::from_public_key_pem(pem).map_err(|_| {
            Error::BadConfig("root public key is not a valid RSA public key".to_string())
        })?;

        let data_store_registry = DataStoreRegistry::with_builtin_types();
        let data_store = data_store_registry.create(&config.data_store_type, None)?;

        // Each backend gets its own subdirectory of the configured
        // location, so the stores stay independent.
        let key_store_registry = KeyStoreRegistry::with_builtin_types();
        let key_stores: Vec<Arc<dyn KeyStore>> = (0..config.key_store_count)
            .map(|i| {
                let location = config.key_store_location.as_ref().map(|l| l.join(format!("ks{i}")));
                key_store_registry.create(&config.key_store_type, location.as_deref())
            })
            .collect::<Result<_>>()?;
        let sharer = SecretSharer::random_field(
            config.share_field_bits,
            config.key_store_count,
            config.key_store_threshold,
        );
        let key_store =
            Arc::new(VirtualKeyStore::new(key_stores, config.key_store_threshold, sharer)?);

        let namespaces = NamespaceManager::new(data_store.clone());
        namespaces.init().await?;

        let secrets = SecretManager::with_builtin_types(data_store.clone(), key_store.clone());
        let authn = AuthnManager::new(data_store.clone(), key_store);
        let authz = AuthzManager::new(data_store);

        let state = Self { config, namespaces, secrets, authn, authz };
        state.init_root_user(root_public_key_pem).await?;

        Ok(state)
    }

    /// Create the `root` principal from the configured public key if it
    /// does not exist yet.
    async fn init_root_user(&self, root_public_key_pem: Vec<u8>) -> Result<()> {
        if self.authn.get_user("root").await.is_ok() {
            return Ok(());
        }

        let root = UserEntry {
            username: "root".to_string(),
            credentials: root_public_key_pem,
            roles: Vec::new(),
        };
        self.authn.create_user(&root).await?;

        tracing::info!("root user initialized from configured public key");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::RsaPrivateKey;

    fn root_pem() -> Vec<u8> {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        private_key
            .to_public_key()
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .unwrap()
            .into_bytes()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_builtins_and_root() {
        let state = AppState::with_root_key(Config::default(), root_pem()).await.unwrap();

        for path in ["/", "/users", "/secrets"] {
            state.namespaces.get_namespace(path).await.unwrap();
        }

        let root = state.authn.get_user("root").await.unwrap();
        assert_eq!(root.username, "root");
    }

    #[tokio::test]
    async fn test_bootstrap_with_file_key_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            key_store_type: "FileKeyStore".to_string(),
            key_store_location: Some(dir.path().to_path_buf()),
            ..Config::default()
        };

        let state = AppState::with_root_key(config, root_pem()).await.unwrap();
        state.authn.get_user("root").await.unwrap();

        // One subdirectory per backend.
        for i in 0..3 {
            assert!(dir.path().join(format!("ks{i}")).is_dir());
        }
    }

    #[tokio::test]
    async fn test_invalid_root_key_is_bad_config() {
        let result = AppState::with_root_key(Config::default(), b"not a pem".to_vec()).await;
        assert!(matches!(result, Err(Error::BadConfig(_))));
    }

    #[tokio::test]
    async fn test_missing_root_key_path_is_bad_config() {
        let result = AppState::new(Config::default()).await;
        assert!(matches!(result, Err(Error::BadConfig(_))));
    }
}
