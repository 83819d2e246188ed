//! Canonical mapping between domain entities and data-store records,
//! and the hierarchical path scheme.
//!
//! Every persisted entity is one record: the entity's canonical path as
//! the id, its payload as the data bytes, and a JSON [`MetaData`]
//! carrying the entry type discriminator. Decoding fails closed with
//! the opaque internal error on a wrong discriminator or malformed
//! metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealbox_model::{
    AuthorizationPolicyEntry, Error, NamespaceEntry, Operation, Result, RoleEntry, SecretEntry,
    UserEntry,
};

use crate::DataStoreEntry;

/// Directory name reserved for policy entries under each namespace.
pub const POLICIES_DIRNAME: &str = "policies";

const SECRETS_PATH_PREFIX: &str = "/secrets/";
const USERS_PATH_PREFIX: &str = "/users/";

const SECRET_ENTRY_TYPE: &str = "secret";
const USER_ENTRY_TYPE: &str = "user";
const NAMESPACE_ENTRY_TYPE: &str = "namespace";
const POLICY_ENTRY_TYPE: &str = "authzPolicy";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMetaData {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationMetaData {
    #[serde(default)]
    pub label: String,
}

/// Metadata attached to every record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaData {
    #[serde(default)]
    pub entry_type: String,
    #[serde(default)]
    pub secret_type: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub expiration_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub roles: Vec<RoleMetaData>,
    #[serde(default)]
    pub allowed_operations: Vec<OperationMetaData>,
}

pub fn secret_entry_to_data_store_entry(secret: &SecretEntry) -> Result<DataStoreEntry> {
    let meta_data = MetaData {
        entry_type: SECRET_ENTRY_TYPE.to_string(),
        secret_type: secret.secret_type.clone(),
        owner: secret.owner.clone(),
        expiration_time: secret.expiration_time,
        ..Default::default()
    };

    Ok(DataStoreEntry {
        id: secret_id_to_path(&secret.id),
        data: secret.secret_data.clone(),
        meta_data: encode_meta_data(&meta_data)?,
    })
}

pub fn data_store_entry_to_secret_entry(entry: &DataStoreEntry) -> Result<SecretEntry> {
    let meta_data = decode_meta_data(&entry.meta_data, SECRET_ENTRY_TYPE)?;

    Ok(SecretEntry {
        id: secret_path_to_id(&entry.id).to_string(),
        secret_type: meta_data.secret_type,
        meta_data: String::new(),
        secret_data: entry.data.clone(),
        owner: meta_data.owner,
        expiration_time: meta_data.expiration_time,
    })
}

pub fn user_entry_to_data_store_entry(user: &UserEntry) -> Result<DataStoreEntry> {
    let meta_data = MetaData {
        entry_type: USER_ENTRY_TYPE.to_string(),
        owner: user.username.clone(),
        roles: user.roles.iter().map(role_to_meta_data).collect(),
        ..Default::default()
    };

    Ok(DataStoreEntry {
        id: username_to_path(&user.username),
        data: user.credentials.clone(),
        meta_data: encode_meta_data(&meta_data)?,
    })
}

pub fn data_store_entry_to_user_entry(entry: &DataStoreEntry) -> Result<UserEntry> {
    let meta_data = decode_meta_data(&entry.meta_data, USER_ENTRY_TYPE)?;

    Ok(UserEntry {
        username: user_path_to_name(&entry.id).to_string(),
        credentials: entry.data.clone(),
        roles: meta_data.roles.iter().map(role_from_meta_data).collect(),
    })
}

pub fn namespace_entry_to_data_store_entry(namespace: &NamespaceEntry) -> Result<DataStoreEntry> {
    let meta_data = MetaData {
        entry_type: NAMESPACE_ENTRY_TYPE.to_string(),
        owner: namespace.owner.clone(),
        roles: namespace.role_labels.iter().map(|label| role_label_to_meta_data(label)).collect(),
        ..Default::default()
    };

    Ok(DataStoreEntry {
        id: namespace.path.clone(),
        data: Vec::new(),
        meta_data: encode_meta_data(&meta_data)?,
    })
}

pub fn data_store_entry_to_namespace_entry(entry: &DataStoreEntry) -> Result<NamespaceEntry> {
    let meta_data = decode_meta_data(&entry.meta_data, NAMESPACE_ENTRY_TYPE)?;

    Ok(NamespaceEntry {
        path: entry.id.clone(),
        owner: meta_data.owner,
        role_labels: meta_data.roles.iter().map(|role| role.label.clone()).collect(),
        child_paths: Vec::new(),
    })
}

pub fn policy_entry_to_data_store_entry(
    policy: &AuthorizationPolicyEntry,
) -> Result<DataStoreEntry> {
    let meta_data = MetaData {
        entry_type: POLICY_ENTRY_TYPE.to_string(),
        owner: policy.owner.clone(),
        roles: policy.role_labels.iter().map(|label| role_label_to_meta_data(label)).collect(),
        allowed_operations: policy
            .allowed_operations
            .iter()
            .map(|op| OperationMetaData { label: op.label.clone() })
            .collect(),
        ..Default::default()
    };

    Ok(DataStoreEntry {
        id: policy_id_to_path(&policy.id),
        data: Vec::new(),
        meta_data: encode_meta_data(&meta_data)?,
    })
}

pub fn data_store_entry_to_policy_entry(entry: &DataStoreEntry) -> Result<AuthorizationPolicyEntry> {
    let meta_data = decode_meta_data(&entry.meta_data, POLICY_ENTRY_TYPE)?;

    Ok(AuthorizationPolicyEntry {
        id: policy_path_to_id(&entry.id),
        role_labels: meta_data.roles.iter().map(|role| role.label.clone()).collect(),
        allowed_operations: meta_data
            .allowed_operations
            .iter()
            .map(|op| Operation { label: op.label.clone() })
            .collect(),
        owner: meta_data.owner,
    })
}

pub fn is_secret_entry(entry: &DataStoreEntry) -> bool {
    entry_type_of(entry) == Some(SECRET_ENTRY_TYPE.to_string())
}

pub fn is_user_entry(entry: &DataStoreEntry) -> bool {
    entry_type_of(entry) == Some(USER_ENTRY_TYPE.to_string())
}

pub fn is_namespace_entry(entry: &DataStoreEntry) -> bool {
    entry_type_of(entry) == Some(NAMESPACE_ENTRY_TYPE.to_string())
}

pub fn is_policy_entry(entry: &DataStoreEntry) -> bool {
    entry_type_of(entry) == Some(POLICY_ENTRY_TYPE.to_string())
}

pub fn entries_to_paths(entries: &[DataStoreEntry]) -> Vec<String> {
    entries.iter().map(|entry| entry.id.clone()).collect()
}

/// `/secrets/{id}`; nested ids are allowed.
pub fn secret_id_to_path(secret_id: &str) -> String {
    format!("{SECRETS_PATH_PREFIX}{secret_id}")
}

pub fn secret_path_to_id(secret_path: &str) -> &str {
    secret_path.strip_prefix(SECRETS_PATH_PREFIX).unwrap_or(secret_path)
}

/// `/users/{username}`.
pub fn username_to_path(username: &str) -> String {
    format!("{USERS_PATH_PREFIX}{username}")
}

pub fn user_path_to_name(user_path: &str) -> &str {
    user_path.strip_prefix(USERS_PATH_PREFIX).unwrap_or(user_path)
}

/// A policy with id `a/b/p` lives at `/a/b/policies/p`: the policy file
/// sits in the reserved `policies/` subtree of its enclosing scope.
pub fn policy_id_to_path(policy_id: &str) -> String {
    match policy_id.rsplit_once('/') {
        Some((dir, name)) => format!("/{dir}/{POLICIES_DIRNAME}/{name}"),
        None => format!("/{POLICIES_DIRNAME}/{policy_id}"),
    }
}

pub fn policy_path_to_id(policy_path: &str) -> String {
    let (dir, name) = match policy_path.rsplit_once('/') {
        Some(parts) => parts,
        None => return policy_path.to_string(),
    };

    let scope = dir
        .strip_suffix(POLICIES_DIRNAME)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or(dir);
    let scope = scope.trim_matches('/');

    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}/{name}")
    }
}

/// Parent of a path; the root is its own parent.
pub fn parent_path(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

/// Path-aware prefix test: `/q` covers `/q` and `/q/...` but not `/qq`.
pub fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

fn encode_meta_data(meta_data: &MetaData) -> Result<String> {
    serde_json::to_string(meta_data).map_err(|_| Error::Internal)
}

fn decode_meta_data(raw: &str, expected_type: &str) -> Result<MetaData> {
    let meta_data: MetaData = serde_json::from_str(raw).map_err(|_| Error::Internal)?;
    if meta_data.entry_type != expected_type {
        return Err(Error::Internal);
    }
    Ok(meta_data)
}

fn entry_type_of(entry: &DataStoreEntry) -> Option<String> {
    serde_json::from_str::<MetaData>(&entry.meta_data)
        .ok()
        .map(|meta_data| meta_data.entry_type)
}

fn role_to_meta_data(role: &RoleEntry) -> RoleMetaData {
    RoleMetaData { scope: role.scope.clone(), label: role.label.clone() }
}

fn role_from_meta_data(role: &RoleMetaData) -> RoleEntry {
    RoleEntry { scope: role.scope.clone(), label: role.label.clone() }
}

fn role_label_to_meta_data(label: &str) -> RoleMetaData {
    RoleMetaData { scope: String::new(), label: label.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_entry_roundtrip() {
        let secret = SecretEntry {
            id: "db/password".to_string(),
            secret_type: "Data".to_string(),
            meta_data: String::new(),
            secret_data: vec![9, 9, 9],
            owner: "alice".to_string(),
            expiration_time: None,
        };

        let entry = secret_entry_to_data_store_entry(&secret).unwrap();
        assert_eq!(entry.id, "/secrets/db/password");
        assert!(is_secret_entry(&entry));
        assert!(!is_user_entry(&entry));

        let back = data_store_entry_to_secret_entry(&entry).unwrap();
        assert_eq!(back.id, secret.id);
        assert_eq!(back.secret_type, secret.secret_type);
        assert_eq!(back.secret_data, secret.secret_data);
        assert_eq!(back.owner, secret.owner);
    }

    #[test]
    fn test_user_entry_roundtrip() {
        let user = UserEntry {
            username: "alice".to_string(),
            credentials: b"public key pem".to_vec(),
            roles: vec![RoleEntry { scope: "/prod".to_string(), label: "admin".to_string() }],
        };

        let entry = user_entry_to_data_store_entry(&user).unwrap();
        assert_eq!(entry.id, "/users/alice");
        assert!(is_user_entry(&entry));

        let back = data_store_entry_to_user_entry(&entry).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_namespace_entry_roundtrip() {
        let namespace = NamespaceEntry {
            path: "/prod/db".to_string(),
            owner: "root".to_string(),
            role_labels: vec!["admin".to_string(), "reader".to_string()],
            child_paths: Vec::new(),
        };

        let entry = namespace_entry_to_data_store_entry(&namespace).unwrap();
        assert_eq!(entry.id, "/prod/db");
        assert!(entry.data.is_empty());
        assert!(is_namespace_entry(&entry));

        let back = data_store_entry_to_namespace_entry(&entry).unwrap();
        assert_eq!(back, namespace);
    }

    #[test]
    fn test_policy_entry_roundtrip() {
        let policy = AuthorizationPolicyEntry {
            id: "prod/db/readers".to_string(),
            role_labels: vec!["reader".to_string()],
            allowed_operations: vec![Operation::read()],
            owner: "root".to_string(),
        };

        let entry = policy_entry_to_data_store_entry(&policy).unwrap();
        assert_eq!(entry.id, "/prod/db/policies/readers");
        assert!(is_policy_entry(&entry));

        let back = data_store_entry_to_policy_entry(&entry).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_wrong_entry_type_fails_closed() {
        let user = UserEntry {
            username: "alice".to_string(),
            credentials: vec![],
            roles: vec![],
        };
        let entry = user_entry_to_data_store_entry(&user).unwrap();

        assert_eq!(data_store_entry_to_secret_entry(&entry), Err(Error::Internal));
        assert_eq!(data_store_entry_to_namespace_entry(&entry), Err(Error::Internal));
    }

    #[test]
    fn test_malformed_meta_data_fails_closed() {
        let entry = DataStoreEntry {
            id: "/x".to_string(),
            data: vec![],
            meta_data: "not json".to_string(),
        };

        assert_eq!(data_store_entry_to_namespace_entry(&entry), Err(Error::Internal));
        assert!(!is_namespace_entry(&entry));
    }

    #[test]
    fn test_policy_path_mapping() {
        assert_eq!(policy_id_to_path("p"), "/policies/p");
        assert_eq!(policy_id_to_path("a/b/p"), "/a/b/policies/p");

        assert_eq!(policy_path_to_id("/policies/p"), "p");
        assert_eq!(policy_path_to_id("/a/b/policies/p"), "a/b/p");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/a/b/c"), "/a/b");
        assert_eq!(parent_path("/a"), "/");
        assert_eq!(parent_path("/"), "/");
    }

    #[test]
    fn test_path_has_prefix() {
        assert!(path_has_prefix("/a/b", "/"));
        assert!(path_has_prefix("/a/b", "/a"));
        assert!(path_has_prefix("/a", "/a"));
        assert!(!path_has_prefix("/ab", "/a"));
        assert!(!path_has_prefix("/b", "/a"));
    }
}
