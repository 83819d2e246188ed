//! Authenticated symmetric encryption for envelope payloads.
//!
//! Ciphertext layout:
//!
//! ```text
//! IV(16) || AES-256-CBC( len_be32 || plaintext || SHA-256(plaintext) || zero-pad )
//! ```
//!
//! The length prefix delimits the plaintext inside the padded block
//! stream; the SHA-256 trailer authenticates it. Decryption recomputes
//! the digest and compares in constant time, failing closed on any
//! mismatch or short input.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of a data-encryption key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

const BLOCK_SIZE: usize = 16;
const LEN_PREFIX_SIZE: usize = 4;
const DIGEST_SIZE: usize = 32;

/// Generate a fresh 32-byte data-encryption key from the OS CSPRNG.
///
/// The returned buffer zeroes itself on drop.
pub fn generate_key() -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut key);
    key
}

/// Encrypt `data` under `key` with a fresh random IV.
pub fn encrypt(data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    let digest = Sha256::digest(data);

    // len || plaintext || digest, zero-padded to the block size.
    let unpadded_len = LEN_PREFIX_SIZE + data.len() + DIGEST_SIZE;
    let padded_len = unpadded_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

    let mut buf = Zeroizing::new(vec![0u8; padded_len]);
    buf[..LEN_PREFIX_SIZE].copy_from_slice(&(data.len() as u32).to_be_bytes());
    buf[LEN_PREFIX_SIZE..LEN_PREFIX_SIZE + data.len()].copy_from_slice(data);
    buf[LEN_PREFIX_SIZE + data.len()..unpadded_len].copy_from_slice(&digest);

    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);

    let enc = Aes256CbcEnc::new_from_slices(key, &iv)
        .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: key.len() })?;

    let mut out = Vec::with_capacity(BLOCK_SIZE + padded_len);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&enc.encrypt_padded_vec_mut::<NoPadding>(&buf));

    Ok(out)
}

/// Decrypt `ciphertext` under `key` and verify the embedded digest.
pub fn decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    if ciphertext.len() < BLOCK_SIZE * 2 || (ciphertext.len() - BLOCK_SIZE) % BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (iv, body) = ciphertext.split_at(BLOCK_SIZE);

    let dec = Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: key.len() })?;

    let plain = Zeroizing::new(
        dec.decrypt_padded_vec_mut::<NoPadding>(body)
            .map_err(|_| CryptoError::InvalidCiphertext)?,
    );

    let mut len_bytes = [0u8; LEN_PREFIX_SIZE];
    len_bytes.copy_from_slice(&plain[..LEN_PREFIX_SIZE]);
    let data_len = u32::from_be_bytes(len_bytes) as usize;

    if plain.len() < LEN_PREFIX_SIZE + data_len + DIGEST_SIZE {
        return Err(CryptoError::InvalidCiphertext);
    }

    let data = &plain[LEN_PREFIX_SIZE..LEN_PREFIX_SIZE + data_len];
    let stored = &plain[LEN_PREFIX_SIZE + data_len..LEN_PREFIX_SIZE + data_len + DIGEST_SIZE];

    let computed = Sha256::digest(data);
    if computed.as_slice().ct_eq(stored).unwrap_u8() != 1 {
        return Err(CryptoError::InvalidCiphertext);
    }

    Ok(data.to_vec())
}

fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength { expected: KEY_SIZE, actual: key.len() });
    }
    Ok(())
}
