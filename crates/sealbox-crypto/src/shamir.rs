//! Shamir `(n, k)` secret sharing over a random prime field.
//!
//! A secret is encoded as the big-endian integer `secret || SHA-256(secret)`
//! and becomes the constant term of a degree `k - 1` polynomial with
//! random coefficients below the field prime. Share `i` is the
//! polynomial evaluated at `x = i` for `i = 1..=n`. Any `k` shares
//! recover the constant term by Lagrange interpolation at `x = 0` in
//! the prime field; the digest trailer detects wrong or insufficient
//! shares.

use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::random::{rand_below, rand_prime};
use crate::{CryptoError, Result};

const DIGEST_SIZE: usize = 32;
const SHARE_VERSION: u32 = 1;

/// One share of a split secret.
///
/// Every share of one secret references the same prime field; shares
/// with differing fields cannot be combined. On the wire the big
/// integers are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretShare {
    pub index: u32,
    #[serde(with = "decimal")]
    pub value: BigUint,
    #[serde(with = "decimal")]
    pub field: BigUint,
    pub version: u32,
}

/// Splits secrets into `n` shares of which any `k` reconstruct.
#[derive(Debug, Clone)]
pub struct SecretSharer {
    field: BigUint,
    n: usize,
    k: usize,
}

impl SecretSharer {
    /// Create a sharer over a freshly generated prime field of the
    /// given bit width.
    pub fn random_field(bits: usize, n: usize, k: usize) -> Self {
        Self { field: rand_prime(bits), n, k }
    }

    /// Create a sharer over an existing field.
    pub fn with_field(field: BigUint, n: usize, k: usize) -> Self {
        Self { field, n, k }
    }

    pub fn share_count(&self) -> usize {
        self.n
    }

    pub fn threshold(&self) -> usize {
        self.k
    }

    /// Split `secret` into `n` shares.
    pub fn split(&self, secret: &[u8]) -> Vec<SecretShare> {
        let mut encoded = Vec::with_capacity(secret.len() + DIGEST_SIZE);
        encoded.extend_from_slice(secret);
        encoded.extend_from_slice(&Sha256::digest(secret));
        let constant = BigUint::from_bytes_be(&encoded);

        let poly = Polynomial::new(constant, self.k - 1, &self.field);

        (1..=self.n as u32)
            .map(|i| SecretShare {
                index: i,
                value: poly.eval(i),
                field: self.field.clone(),
                version: SHARE_VERSION,
            })
            .collect()
    }

    /// Reconstruct a secret from at least `k` shares.
    pub fn reconstruct(&self, shares: &[SecretShare]) -> Result<Vec<u8>> {
        if shares.len() < 2 {
            return Err(CryptoError::Reconstruction(
                "expected at least two shares".to_string(),
            ));
        }
        if shares.len() < self.k {
            return Err(CryptoError::Reconstruction(format!(
                "expected at least {} shares, got {}",
                self.k,
                shares.len()
            )));
        }

        let field = &shares[0].field;
        if shares.iter().any(|s| &s.field != field) {
            return Err(CryptoError::Reconstruction(
                "shares must reference the same field".to_string(),
            ));
        }

        let mut sorted: Vec<&SecretShare> = shares.iter().collect();
        sorted.sort_by_key(|s| s.index);
        let selected = &sorted[..self.k];

        let constant = interpolate_at_zero(selected, field)?;

        let encoded = constant.to_bytes_be();
        if encoded.len() <= DIGEST_SIZE {
            return Err(CryptoError::Reconstruction(
                "reconstruction result is too short".to_string(),
            ));
        }

        let (data, stored_digest) = encoded.split_at(encoded.len() - DIGEST_SIZE);
        if Sha256::digest(data).as_slice() != stored_digest {
            return Err(CryptoError::Reconstruction(
                "reconstruction result failed verification".to_string(),
            ));
        }

        Ok(data.to_vec())
    }
}

/// Lagrange interpolation at `x = 0` in the prime field.
fn interpolate_at_zero(shares: &[&SecretShare], field: &BigUint) -> Result<BigUint> {
    let mut acc = BigUint::from(0u32);

    for (i, share) in shares.iter().enumerate() {
        let mut numerator = BigUint::from(1u32);
        let mut denominator = BigUint::from(1u32);

        for (j, other) in shares.iter().enumerate() {
            if i == j {
                continue;
            }
            // (0 - x_j) mod p
            numerator = numerator * (field - BigUint::from(other.index)) % field;
            denominator = denominator * sub_mod(share.index, other.index, field) % field;
        }

        if denominator == BigUint::from(0u32) {
            return Err(CryptoError::Reconstruction(
                "duplicate share indices".to_string(),
            ));
        }

        // Fermat inverse; the field is prime and the denominator nonzero.
        let inverse = denominator.modpow(&(field - BigUint::from(2u32)), field);
        let weight = numerator * inverse % field;

        acc = (acc + weight * &share.value) % field;
    }

    Ok(acc)
}

/// `(a - b) mod p` for share indices.
fn sub_mod(a: u32, b: u32, field: &BigUint) -> BigUint {
    if a >= b {
        BigUint::from(a - b)
    } else {
        field - BigUint::from(b - a)
    }
}

struct Polynomial {
    coefficients: Vec<BigUint>,
    field: BigUint,
}

impl Polynomial {
    /// Degree `degree` polynomial with the given constant term and
    /// random higher coefficients below the field prime.
    fn new(constant: BigUint, degree: usize, field: &BigUint) -> Self {
        let mut coefficients = Vec::with_capacity(degree + 1);
        coefficients.push(constant);
        for _ in 0..degree {
            coefficients.push(rand_below(field));
        }

        Self { coefficients, field: field.clone() }
    }

    /// Evaluate at `x` in the field (Horner form).
    fn eval(&self, x: u32) -> BigUint {
        let x = BigUint::from(x);
        let mut acc = BigUint::from(0u32);
        for coefficient in self.coefficients.iter().rev() {
            acc = (acc * &x + coefficient) % &self.field;
        }
        acc
    }
}

mod decimal {
    use num_bigint_dig::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.as_bytes(), 10)
            .ok_or_else(|| de::Error::custom("invalid decimal integer"))
    }
}
