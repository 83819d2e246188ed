//! Entities of the hierarchical namespace and the request/response
//! types of the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operation labels used by authorization policies.
pub const OP_CREATE: &str = "C";
pub const OP_READ: &str = "R";
pub const OP_UPDATE: &str = "U";
pub const OP_DELETE: &str = "D";

/// An operation a policy may allow, identified by its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub label: String,
}

impl Operation {
    pub fn create() -> Self {
        Self { label: OP_CREATE.to_string() }
    }

    pub fn read() -> Self {
        Self { label: OP_READ.to_string() }
    }

    pub fn update() -> Self {
        Self { label: OP_UPDATE.to_string() }
    }

    pub fn delete() -> Self {
        Self { label: OP_DELETE.to_string() }
    }
}

/// A role granted to a user: a label valid within a path scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntry {
    pub scope: String,
    pub label: String,
}

/// A user of the service. `credentials` carries the user's serialized
/// RSA public key: plaintext at the edge, ciphertext at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    pub username: String,
    #[serde(default, with = "base64_bytes")]
    pub credentials: Vec<u8>,
    #[serde(default)]
    pub roles: Vec<RoleEntry>,
}

/// Secret type names understood by the secret engine.
pub const SECRET_TYPE_DATA: &str = "Data";
pub const SECRET_TYPE_RSA_PRIVATE_KEY: &str = "RSAPrivateKey";
pub const SECRET_TYPE_X509_CERTIFICATE: &str = "X509Certificate";

/// A typed secret. `secret_data` is plaintext at the edge and
/// ciphertext at rest; `meta_data` is type-specific JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEntry {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub secret_type: String,
    #[serde(default)]
    pub meta_data: String,
    #[serde(default, with = "base64_bytes")]
    pub secret_data: Vec<u8>,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
}

/// A node of the path tree. `child_paths` is derived on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceEntry {
    pub path: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub role_labels: Vec<String>,
    #[serde(default)]
    pub child_paths: Vec<String>,
}

/// An authorization grant: `(role labels, operations)` attached to the
/// namespace its id is rooted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationPolicyEntry {
    pub id: String,
    #[serde(default)]
    pub role_labels: Vec<String>,
    #[serde(default)]
    pub allowed_operations: Vec<Operation>,
    #[serde(default)]
    pub owner: String,
}

/// Response to every create operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationResponse {
    pub id: String,
}

/// Both phases of login post this to `/login`: phase one carries only
/// the username, phase two adds the decrypted challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    #[serde(default)]
    pub challenge: Option<String>,
}

/// Phase one answers with an encrypted challenge, phase two with a
/// signed bearer token; both travel in the same field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub challenge_or_token: String,
}

/// Serde adapter encoding byte fields as standard base64 strings.
pub mod base64_bytes {
    use base64::prelude::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(text.as_bytes())
            .map_err(|_| de::Error::custom("invalid base64"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_entry_wire_shape() {
        let entry = SecretEntry {
            id: "s1".to_string(),
            secret_type: SECRET_TYPE_DATA.to_string(),
            meta_data: String::new(),
            secret_data: b"hello".to_vec(),
            owner: "alice".to_string(),
            expiration_time: None,
        };

        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "Data");
        assert_eq!(json["secretData"], "aGVsbG8=");

        let back: SecretEntry = serde_json::from_value(json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_partial_create_bodies_deserialize() {
        let user: UserEntry = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert_eq!(user.username, "bob");
        assert!(user.credentials.is_empty());
        assert!(user.roles.is_empty());

        let login: LoginRequest = serde_json::from_str(r#"{"username": "bob"}"#).unwrap();
        assert!(login.challenge.is_none());
    }

    #[test]
    fn test_login_response_field_name() {
        let response = LoginResponse { challenge_or_token: "abc".to_string() };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("challengeOrToken"));
    }
}
