use num_bigint_dig::{BigUint, RandBigInt, RandPrime};
use rand::rngs::OsRng;

/// Generate a random prime of the given bit width.
pub fn rand_prime(bits: usize) -> BigUint {
    OsRng.gen_prime(bits)
}

/// Generate a uniform random integer in `[0, limit)`.
pub fn rand_below(limit: &BigUint) -> BigUint {
    OsRng.gen_biguint_below(limit)
}
