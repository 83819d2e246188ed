//! Request body validation. Anything rejected here maps to HTTP 400.

use crate::error::{Error, Result};
use crate::types::{
    AuthorizationPolicyEntry, LoginRequest, NamespaceEntry, SecretEntry, UserEntry,
};

pub fn validate_user_entry(entry: &UserEntry) -> Result<()> {
    if entry.username.is_empty() || entry.username.contains('/') {
        return Err(Error::InputValidation);
    }
    if entry.credentials.is_empty() {
        return Err(Error::InputValidation);
    }
    for role in &entry.roles {
        if role.label.is_empty() || !role.scope.starts_with('/') {
            return Err(Error::InputValidation);
        }
    }
    Ok(())
}

pub fn validate_secret_entry(entry: &SecretEntry) -> Result<()> {
    if entry.secret_type.is_empty() {
        return Err(Error::InputValidation);
    }
    // A missing id is allowed; the engine assigns one.
    if entry.id.starts_with('/') || entry.id.ends_with('/') {
        return Err(Error::InputValidation);
    }
    Ok(())
}

pub fn validate_namespace_entry(entry: &NamespaceEntry) -> Result<()> {
    validate_path(&entry.path)
}

pub fn validate_policy_entry(entry: &AuthorizationPolicyEntry) -> Result<()> {
    if entry.id.is_empty() || entry.id.starts_with('/') || entry.id.ends_with('/') {
        return Err(Error::InputValidation);
    }
    Ok(())
}

pub fn validate_login_request(request: &LoginRequest) -> Result<()> {
    if request.username.is_empty() {
        return Err(Error::InputValidation);
    }
    Ok(())
}

/// Paths are absolute, `/`-separated, with no empty or dot segments.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::InputValidation);
    }
    if path == "/" {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(Error::InputValidation);
    }
    for segment in path[1..].split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(Error::InputValidation);
        }
    }
    Ok(())
}
