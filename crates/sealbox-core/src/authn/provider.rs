//! The built-in authentication provider: users with RSA public-key
//! credentials, a two-phase challenge–response login and HMAC-signed
//! bearer tokens.
//!
//! User credentials are stored like any secret: envelope-encrypted in
//! the data store with the data key fanned out through the virtual key
//! store under the user's canonical path.

use std::sync::Arc;

use base64::prelude::*;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sealbox_model::{Error, LoginRequest, Result, UserEntry};
use sealbox_vds::{codec, DataStore};
use sealbox_vks::VirtualKeyStore;
use serde::{Deserialize, Serialize};
use tracing::info;
use zeroize::Zeroizing;

use super::challenge::Challenge;

/// How long an issued bearer token stays valid.
pub const TOKEN_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    name: String,
    exp: u64,
}

pub struct BuiltinProvider {
    data_store: Arc<dyn DataStore>,
    key_store: Arc<VirtualKeyStore>,
    // Generated at startup; a restart invalidates outstanding tokens.
    token_signing_key: Zeroizing<Vec<u8>>,
}

impl BuiltinProvider {
    pub fn new(data_store: Arc<dyn DataStore>, key_store: Arc<VirtualKeyStore>) -> Self {
        Self {
            data_store,
            key_store,
            token_signing_key: sealbox_crypto::generate_key(),
        }
    }

    pub async fn create_user(&self, user: &UserEntry) -> Result<String> {
        let user_path = codec::username_to_path(&user.username);

        if self.data_store.read(&user_path).await.is_ok() {
            return Err(Error::AlreadyExists);
        }

        // Every role scope must name an existing namespace.
        for role in &user.roles {
            if !role.scope.starts_with('/') {
                return Err(Error::InputValidation);
            }
            let scope_entry =
                self.data_store.read(&role.scope).await.map_err(|_| Error::InputValidation)?;
            if !codec::is_namespace_entry(&scope_entry) {
                return Err(Error::InputValidation);
            }
        }

        let key = sealbox_crypto::generate_key();
        let encrypted_credentials =
            sealbox_crypto::encrypt(&user.credentials, &key).map_err(|_| Error::Internal)?;

        let mut stored = user.clone();
        stored.credentials = encrypted_credentials;

        let data_store_entry = codec::user_entry_to_data_store_entry(&stored)?;
        self.data_store.create(&data_store_entry).await?;

        self.key_store.create(&user_path, &key).await?;

        info!(username = %user.username, "user created");

        Ok(user.username.clone())
    }

    pub async fn get_user(&self, username: &str) -> Result<UserEntry> {
        let user_path = codec::username_to_path(username);

        let data_store_entry = self.data_store.read(&user_path).await?;
        let key = self.key_store.read(&user_path).await?;

        let mut user = codec::data_store_entry_to_user_entry(&data_store_entry)?;
        user.credentials =
            sealbox_crypto::decrypt(&user.credentials, &key).map_err(|_| Error::Internal)?;

        Ok(user)
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let user_path = codec::username_to_path(username);

        self.data_store.delete(&user_path).await?;
        self.key_store.delete(&user_path).await?;

        info!(username = %username, "user deleted");

        Ok(())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<String> {
        match request.challenge.as_deref() {
            None | Some("") => self.login_phase_one(&request.username).await,
            Some(challenge) => self.login_phase_two(&request.username, challenge),
        }
    }

    /// Phase one: encrypt a fresh challenge under the user's public
    /// key. An unknown user gets a fake challenge of the same shape so
    /// the response does not reveal whether the account exists.
    async fn login_phase_one(&self, username: &str) -> Result<String> {
        let user_path = codec::username_to_path(username);

        let stored_entry = self.data_store.read(&user_path).await;
        let stored_key = self.key_store.read(&user_path).await;

        let (data_store_entry, key) = match (stored_entry, stored_key) {
            (Ok(entry), Ok(key)) => (entry, key),
            _ => return self.fake_challenge(username).await,
        };

        let user = codec::data_store_entry_to_user_entry(&data_store_entry)
            .map_err(|_| Error::Unauthorized)?;

        let credentials = sealbox_crypto::decrypt(&user.credentials, &key)
            .map_err(|_| Error::Unauthorized)?;

        let pem = std::str::from_utf8(&credentials).map_err(|_| Error::Unauthorized)?;
        let public_key =
            RsaPublicKey::from_public_key_pem(pem).map_err(|_| Error::Unauthorized)?;

        encrypted_challenge(username, &public_key)
    }

    /// Phase two: the client returns the decrypted challenge; a valid
    /// one earns a bearer token. Every failure collapses to the same
    /// error.
    fn login_phase_two(&self, username: &str, challenge: &str) -> Result<String> {
        let challenge = Challenge::decode(challenge.as_bytes())?;

        if !challenge.valid_for(username) {
            return Err(Error::Unauthorized);
        }

        self.issue_token(&challenge.username)
    }

    /// Same output shape and work profile as a real challenge, bound
    /// to a throwaway key pair nobody holds the private half of.
    async fn fake_challenge(&self, username: &str) -> Result<String> {
        let public_key = tokio::task::spawn_blocking(|| {
            RsaPrivateKey::new(&mut OsRng, 2048).map(|private_key| private_key.to_public_key())
        })
        .await
        .map_err(|_| Error::Unauthorized)?
        .map_err(|_| Error::Unauthorized)?;

        encrypted_challenge(username, &public_key)
    }

    fn issue_token(&self, username: &str) -> Result<String> {
        let claims = Claims {
            name: username.to_string(),
            exp: (Utc::now() + Duration::seconds(TOKEN_LIFETIME_SECONDS)).timestamp() as u64,
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.token_signing_key),
        )
        .map_err(|_| Error::Unauthorized)
    }

    /// Verify an `Authorization` header value of the form
    /// `<scheme> <token>` and return the authenticated username.
    pub fn authenticated(&self, auth_header: &str) -> Result<String> {
        let mut parts = auth_header.split_whitespace();
        let token = match (parts.next(), parts.next(), parts.next()) {
            (Some(_scheme), Some(token), None) => token,
            _ => return Err(Error::Unauthorized),
        };

        self.verify_token(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.token_signing_key),
            &validation,
        )
        .map_err(|_| Error::Unauthorized)?;

        if data.claims.name.is_empty() {
            return Err(Error::Unauthorized);
        }

        Ok(data.claims.name)
    }
}

fn encrypted_challenge(username: &str, public_key: &RsaPublicKey) -> Result<String> {
    let challenge = Challenge::new(username);
    let encoded = challenge.encode()?;

    let ciphertext = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &encoded)
        .map_err(|_| Error::Unauthorized)?;

    Ok(BASE64_STANDARD.encode(ciphertext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;
    use sealbox_crypto::SecretSharer;
    use sealbox_model::RoleEntry;
    use sealbox_vds::{DataStoreEntry, InMemoryDataStore};
    use sealbox_vks::{InMemoryKeyStore, KeyStore};

    fn provider_with_store() -> (BuiltinProvider, Arc<dyn DataStore>) {
        let data_store: Arc<dyn DataStore> = Arc::new(InMemoryDataStore::new());
        let stores: Vec<Arc<dyn KeyStore>> =
            (0..3).map(|_| Arc::new(InMemoryKeyStore::new()) as Arc<dyn KeyStore>).collect();
        let sharer = SecretSharer::random_field(2048, 3, 2);
        let key_store = Arc::new(VirtualKeyStore::new(stores, 2, sharer).unwrap());

        (BuiltinProvider::new(data_store.clone(), key_store), data_store)
    }

    fn test_key_pair() -> (RsaPrivateKey, Vec<u8>) {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .unwrap();
        (private_key, public_pem.into_bytes())
    }

    fn user(username: &str, credentials: Vec<u8>) -> UserEntry {
        UserEntry { username: username.to_string(), credentials, roles: Vec::new() }
    }

    fn decrypt_challenge(private_key: &RsaPrivateKey, blob: &str) -> String {
        let ciphertext = BASE64_STANDARD.decode(blob).unwrap();
        let plaintext = private_key.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap();
        String::from_utf8(plaintext).unwrap()
    }

    #[tokio::test]
    async fn test_login_happy_path() {
        let (provider, _) = provider_with_store();
        let (private_key, public_pem) = test_key_pair();

        provider.create_user(&user("testuser-0", public_pem)).await.unwrap();

        // Phase one: server returns an encrypted challenge.
        let phase_one = LoginRequest { username: "testuser-0".to_string(), challenge: None };
        let blob = provider.login(&phase_one).await.unwrap();

        // The client decrypts it with the private key.
        let challenge_json = decrypt_challenge(&private_key, &blob);
        let challenge: Challenge = serde_json::from_str(&challenge_json).unwrap();
        assert_eq!(challenge.fixed, super::super::challenge::CHALLENGE_MAGIC);
        assert_eq!(challenge.username, "testuser-0");

        // Phase two: the decrypted challenge earns a token.
        let phase_two = LoginRequest {
            username: "testuser-0".to_string(),
            challenge: Some(challenge_json),
        };
        let token = provider.login(&phase_two).await.unwrap();

        let name = provider.authenticated(&format!("Bearer {token}")).unwrap();
        assert_eq!(name, "testuser-0");
    }

    #[tokio::test]
    async fn test_unknown_user_gets_fake_challenge() {
        let (provider, _) = provider_with_store();

        let phase_one = LoginRequest { username: "ghost".to_string(), challenge: None };
        let blob = provider.login(&phase_one).await.unwrap();

        // Structurally a valid base64 blob, like a real challenge.
        assert!(BASE64_STANDARD.decode(&blob).is_ok());

        // Replaying the blob verbatim in phase two never yields a token.
        let phase_two = LoginRequest { username: "ghost".to_string(), challenge: Some(blob) };
        assert_eq!(provider.login(&phase_two).await, Err(Error::Unauthorized));
    }

    #[tokio::test]
    async fn test_challenge_username_must_match() {
        let (provider, _) = provider_with_store();
        let (private_key, public_pem) = test_key_pair();

        provider.create_user(&user("alice", public_pem)).await.unwrap();

        let phase_one = LoginRequest { username: "alice".to_string(), challenge: None };
        let blob = provider.login(&phase_one).await.unwrap();
        let challenge_json = decrypt_challenge(&private_key, &blob);

        let phase_two =
            LoginRequest { username: "mallory".to_string(), challenge: Some(challenge_json) };
        assert_eq!(provider.login(&phase_two).await, Err(Error::Unauthorized));
    }

    #[tokio::test]
    async fn test_expired_challenge_rejected() {
        let (provider, _) = provider_with_store();

        let mut challenge = Challenge::new("alice");
        challenge.good_until = Utc::now() - Duration::seconds(5);
        let challenge_json = String::from_utf8(challenge.encode().unwrap()).unwrap();

        let phase_two =
            LoginRequest { username: "alice".to_string(), challenge: Some(challenge_json) };
        assert_eq!(provider.login(&phase_two).await, Err(Error::Unauthorized));
    }

    #[tokio::test]
    async fn test_authenticated_rejects_bad_headers() {
        let (provider, _) = provider_with_store();

        assert!(provider.authenticated("").is_err());
        assert!(provider.authenticated("Bearer").is_err());
        assert!(provider.authenticated("Bearer a b").is_err());
        assert!(provider.authenticated("Bearer not-a-token").is_err());
    }

    #[tokio::test]
    async fn test_token_from_another_process_rejected() {
        let (provider_a, _) = provider_with_store();
        let (provider_b, _) = provider_with_store();

        let token = provider_a.issue_token("alice").unwrap();
        assert!(provider_a.verify_token(&token).is_ok());
        assert!(provider_b.verify_token(&token).is_err(), "signing keys are process-scoped");
    }

    #[tokio::test]
    async fn test_create_user_requires_existing_role_scopes() {
        let (provider, data_store) = provider_with_store();
        let (_, public_pem) = test_key_pair();

        let mut entry = user("alice", public_pem);
        entry.roles.push(RoleEntry { scope: "/prod".to_string(), label: "admin".to_string() });

        assert_eq!(provider.create_user(&entry).await, Err(Error::InputValidation));

        // Once the namespace exists, creation succeeds.
        let namespace = sealbox_model::NamespaceEntry {
            path: "/prod".to_string(),
            owner: "root".to_string(),
            role_labels: Vec::new(),
            child_paths: Vec::new(),
        };
        let ds_entry = codec::namespace_entry_to_data_store_entry(&namespace).unwrap();
        data_store.create(&ds_entry).await.unwrap();

        provider.create_user(&entry).await.unwrap();
    }

    #[tokio::test]
    async fn test_role_scope_must_be_a_namespace() {
        let (provider, data_store) = provider_with_store();
        let (_, public_pem) = test_key_pair();

        // A non-namespace entry at the scope path is not acceptable.
        data_store
            .create(&DataStoreEntry {
                id: "/prod".to_string(),
                data: Vec::new(),
                meta_data: r#"{"entryType": "secret"}"#.to_string(),
            })
            .await
            .unwrap();

        let mut entry = user("alice", public_pem);
        entry.roles.push(RoleEntry { scope: "/prod".to_string(), label: "admin".to_string() });

        assert_eq!(provider.create_user(&entry).await, Err(Error::InputValidation));
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let (provider, _) = provider_with_store();
        let (_, public_pem) = test_key_pair();

        provider.create_user(&user("alice", public_pem.clone())).await.unwrap();
        assert_eq!(
            provider.create_user(&user("alice", public_pem)).await,
            Err(Error::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_get_user_returns_plaintext_credentials() {
        let (provider, data_store) = provider_with_store();
        let (_, public_pem) = test_key_pair();

        provider.create_user(&user("alice", public_pem.clone())).await.unwrap();

        // At rest the credentials are ciphertext.
        let stored = data_store.read("/users/alice").await.unwrap();
        assert_ne!(stored.data, public_pem);

        let fetched = provider.get_user("alice").await.unwrap();
        assert_eq!(fetched.credentials, public_pem);
    }

    #[tokio::test]
    async fn test_delete_user_removes_both_records() {
        let (provider, data_store) = provider_with_store();
        let (_, public_pem) = test_key_pair();

        provider.create_user(&user("alice", public_pem)).await.unwrap();
        provider.delete_user("alice").await.unwrap();

        assert!(data_store.read("/users/alice").await.is_err());
        assert!(provider.get_user("alice").await.is_err());
        assert!(provider.delete_user("alice").await.is_err());
    }
}
