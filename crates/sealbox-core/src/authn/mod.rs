//! Authentication: user lifecycle, the two-phase challenge–response
//! login and bearer-token verification for the request pipeline.

pub mod challenge;
pub mod provider;

pub use challenge::{Challenge, CHALLENGE_LIFETIME_SECONDS, CHALLENGE_MAGIC};
pub use provider::{BuiltinProvider, TOKEN_LIFETIME_SECONDS};

use std::sync::Arc;

use sealbox_model::{validate, LoginRequest, Result, UserEntry};
use sealbox_vds::DataStore;
use sealbox_vks::VirtualKeyStore;

/// Fronts the authentication provider and owns the whitelist of paths
/// that skip authentication.
pub struct AuthnManager {
    provider: BuiltinProvider,
    whitelist: Vec<&'static str>,
}

impl AuthnManager {
    pub fn new(data_store: Arc<dyn DataStore>, key_store: Arc<VirtualKeyStore>) -> Self {
        Self {
            provider: BuiltinProvider::new(data_store, key_store),
            whitelist: vec!["/login"],
        }
    }

    /// Paths the pre-filter passes through without a token.
    pub fn is_whitelisted(&self, path: &str) -> bool {
        self.whitelist.iter().any(|whitelisted| *whitelisted == path)
    }

    pub async fn create_user(&self, user: &UserEntry) -> Result<String> {
        validate::validate_user_entry(user)?;
        self.provider.create_user(user).await
    }

    pub async fn get_user(&self, username: &str) -> Result<UserEntry> {
        self.provider.get_user(username).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        self.provider.delete_user(username).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<String> {
        validate::validate_login_request(request)?;
        self.provider.login(request).await
    }

    /// Verify an `Authorization` header value and return the caller.
    pub fn authenticated(&self, auth_header: &str) -> Result<String> {
        self.provider.authenticated(auth_header)
    }
}
