//! The engines of sealbox: namespace lifecycle, envelope-encrypted
//! secrets, challenge–response authentication and path-rooted
//! authorization.
//!
//! Every engine works against the [`sealbox_vds::DataStore`] and
//! [`sealbox_vks::VirtualKeyStore`] contracts; nothing here knows which
//! backends are configured.

pub mod authn;
pub mod authz;
pub mod namespace;
pub mod secret;

pub use authn::AuthnManager;
pub use authz::AuthzManager;
pub use namespace::NamespaceManager;
pub use secret::{SecretManager, SecretType, SecretTypeRegistry};
