//! Cryptographic primitives for sealbox.
//!
//! Two capabilities live here:
//!
//! - An authenticated symmetric cipher used for envelope encryption of
//!   every persisted payload ([`cipher`]).
//! - Shamir `(n, k)` polynomial secret sharing over a random prime
//!   field, used by the virtual key store to fan data-encryption keys
//!   out across independent backends ([`shamir`]).
//!
//! Key material is handled through [`zeroize::Zeroizing`] buffers so it
//! is wiped when dropped, on error paths included.

pub mod cipher;
pub mod shamir;

mod random;

pub use cipher::{decrypt, encrypt, generate_key, KEY_SIZE};
pub use shamir::{SecretShare, SecretSharer};

/// Crate-local error type. Callers outside the crypto layer collapse
/// every variant to their opaque internal error so no cipher detail
/// reaches the wire.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("ciphertext is malformed or does not authenticate")]
    InvalidCiphertext,

    #[error("share reconstruction failed: {0}")]
    Reconstruction(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
