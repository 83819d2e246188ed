//! Login challenges. Challenges are self-describing and never stored
//! server-side: validity is checked from the structure and the expiry
//! alone, which bounds replay by the challenge lifetime.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sealbox_model::{types::base64_bytes, Error, Result};
use serde::{Deserialize, Serialize};

/// Fixed marker every genuine challenge carries.
pub const CHALLENGE_MAGIC: &str = "builtin-challenge";

/// How long a challenge stays valid.
pub const CHALLENGE_LIFETIME_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub fixed: String,
    pub username: String,
    #[serde(with = "base64_bytes")]
    pub random: Vec<u8>,
    pub good_until: DateTime<Utc>,
}

impl Challenge {
    pub fn new(username: &str) -> Self {
        let mut random = vec![0u8; 32];
        OsRng.fill_bytes(&mut random);

        Self {
            fixed: CHALLENGE_MAGIC.to_string(),
            username: username.to_string(),
            random,
            good_until: Utc::now() + Duration::seconds(CHALLENGE_LIFETIME_SECONDS),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|_| Error::Internal)
    }

    pub fn decode(encoded: &[u8]) -> Result<Self> {
        serde_json::from_slice(encoded).map_err(|_| Error::Unauthorized)
    }

    /// A challenge is valid iff it carries the magic marker, names the
    /// expected user and has not expired.
    pub fn valid_for(&self, username: &str) -> bool {
        self.fixed == CHALLENGE_MAGIC && self.username == username && Utc::now() < self.good_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_challenge_is_valid() {
        let challenge = Challenge::new("alice");

        assert_eq!(challenge.fixed, CHALLENGE_MAGIC);
        assert_eq!(challenge.random.len(), 32);
        assert!(challenge.valid_for("alice"));
        assert!(!challenge.valid_for("bob"));
    }

    #[test]
    fn test_expired_challenge_is_invalid() {
        let mut challenge = Challenge::new("alice");
        challenge.good_until = Utc::now() - Duration::seconds(1);

        assert!(!challenge.valid_for("alice"));
    }

    #[test]
    fn test_wrong_magic_is_invalid() {
        let mut challenge = Challenge::new("alice");
        challenge.fixed = "something-else".to_string();

        assert!(!challenge.valid_for("alice"));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let challenge = Challenge::new("alice");
        let encoded = challenge.encode().unwrap();
        let decoded = Challenge::decode(&encoded).unwrap();

        assert_eq!(challenge, decoded);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(Challenge::decode(b"not json").is_err());
    }
}
