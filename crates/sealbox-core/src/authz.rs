//! Authorization: policy CRUD and the path-walking access check.
//!
//! Policies live in the reserved `policies/` subtree of the namespace
//! their id is rooted in. An access check walks from the target
//! namespace toward the root and stops at the first namespace that has
//! any policies: the nearest policies are decisive, parent policies are
//! not merged in. Access is granted iff some `(role, operation)` pair
//! matches there.

use std::sync::Arc;

use sealbox_model::{
    validate, AuthorizationPolicyEntry, Error, Operation, RequestContext, Result, UserEntry,
};
use sealbox_vds::{codec, DataStore};
use tracing::info;

const ROOT_USERNAME: &str = "root";

pub struct AuthzManager {
    data_store: Arc<dyn DataStore>,
}

impl AuthzManager {
    pub fn new(data_store: Arc<dyn DataStore>) -> Self {
        Self { data_store }
    }

    /// Create a policy, materializing the enclosing `policies/`
    /// directory namespace if it does not exist yet.
    pub async fn create_policy(
        &self,
        _ctx: &RequestContext,
        entry: &AuthorizationPolicyEntry,
    ) -> Result<String> {
        validate::validate_policy_entry(entry)?;

        let policy_path = codec::policy_id_to_path(&entry.id);
        let policies_dir = codec::parent_path(&policy_path);

        if self.data_store.read(policies_dir).await.is_err() {
            let directory = sealbox_model::NamespaceEntry {
                path: policies_dir.to_string(),
                owner: entry.owner.clone(),
                role_labels: Vec::new(),
                child_paths: Vec::new(),
            };
            let directory_entry = codec::namespace_entry_to_data_store_entry(&directory)?;
            self.data_store.create(&directory_entry).await?;
        }

        let data_store_entry = codec::policy_entry_to_data_store_entry(entry)?;
        self.data_store.create(&data_store_entry).await?;

        info!(id = %entry.id, "authorization policy created");

        Ok(entry.id.clone())
    }

    pub async fn get_policy(
        &self,
        _ctx: &RequestContext,
        policy_id: &str,
    ) -> Result<AuthorizationPolicyEntry> {
        let policy_path = codec::policy_id_to_path(policy_id);
        let data_store_entry = self.data_store.read(&policy_path).await?;
        codec::data_store_entry_to_policy_entry(&data_store_entry)
    }

    pub async fn delete_policy(&self, ctx: &RequestContext, policy_id: &str) -> Result<()> {
        // Verify the entry actually is a policy before deleting it.
        self.get_policy(ctx, policy_id).await?;

        let policy_path = codec::policy_id_to_path(policy_id);
        self.data_store.delete(&policy_path).await?;

        info!(id = %policy_id, "authorization policy deleted");

        Ok(())
    }

    /// Decide whether the caller may perform `op` within
    /// `namespace_path`.
    ///
    /// The target may name a path that was never created as a
    /// namespace; the walk simply continues toward the root, so a
    /// policy at `/` governs the whole tree.
    pub async fn allowed(
        &self,
        ctx: &RequestContext,
        op: &Operation,
        namespace_path: &str,
    ) -> Result<()> {
        let caller = ctx.caller().ok_or(Error::Unauthorized)?;

        if caller == ROOT_USERNAME {
            return self.resolve_namespace(namespace_path).await.map(|_| ());
        }

        let user_path = codec::username_to_path(caller);
        let user_entry = self.data_store.read(&user_path).await.map_err(|_| Error::Unauthorized)?;
        let user =
            codec::data_store_entry_to_user_entry(&user_entry).map_err(|_| Error::Unauthorized)?;

        let mut current = namespace_path.to_string();
        loop {
            if self.is_namespace(&current).await {
                let policies = self.policies_of(&current).await?;
                if !policies.is_empty() {
                    return evaluate(&user, op, namespace_path, &policies);
                }
            }

            if current == "/" {
                return Err(Error::NotFound);
            }
            current = codec::parent_path(&current).to_string();
        }
    }

    /// Nearest existing namespace at or above `path`.
    async fn resolve_namespace(&self, path: &str) -> Result<String> {
        let mut current = path.to_string();
        loop {
            if self.is_namespace(&current).await {
                return Ok(current);
            }
            if current == "/" {
                return Err(Error::NotFound);
            }
            current = codec::parent_path(&current).to_string();
        }
    }

    async fn is_namespace(&self, path: &str) -> bool {
        match self.data_store.read(path).await {
            Ok(entry) => codec::is_namespace_entry(&entry),
            Err(_) => false,
        }
    }

    /// Policies attached to the namespace at `path`, read from its
    /// `policies/` child directory.
    async fn policies_of(&self, path: &str) -> Result<Vec<AuthorizationPolicyEntry>> {
        let policies_dir = if path == "/" {
            format!("/{}", codec::POLICIES_DIRNAME)
        } else {
            format!("{path}/{}", codec::POLICIES_DIRNAME)
        };

        let children = match self.data_store.search_child_entries(&policies_dir).await {
            Ok(children) => children,
            Err(_) => return Ok(Vec::new()),
        };

        let mut policies = Vec::new();
        for child in &children {
            if codec::is_policy_entry(child) {
                policies.push(codec::data_store_entry_to_policy_entry(child)?);
            }
        }

        Ok(policies)
    }
}

/// Check the user's applicable roles against the policies of the
/// decisive namespace. A role applies when its scope is a path prefix
/// of the original target.
fn evaluate(
    user: &UserEntry,
    op: &Operation,
    namespace_path: &str,
    policies: &[AuthorizationPolicyEntry],
) -> Result<()> {
    for role in &user.roles {
        if !codec::path_has_prefix(namespace_path, &role.scope) {
            continue;
        }

        for policy in policies {
            let role_matches = policy.role_labels.iter().any(|label| label == &role.label);
            let op_matches = policy.allowed_operations.iter().any(|allowed| allowed.label == op.label);
            if role_matches && op_matches {
                return Ok(());
            }
        }
    }

    Err(Error::Unauthorized)
}
