//! Authorization policy management. Operations are gated on the
//! namespace a policy id is rooted in.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use sealbox_model::{AuthorizationPolicyEntry, CreationResponse, Operation, RequestContext};
use sealbox_vds::codec;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /authz/policies
pub async fn create_policy(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(entry): Json<AuthorizationPolicyEntry>,
) -> Result<(StatusCode, Json<CreationResponse>), ApiError> {
    state.authz.allowed(&ctx, &Operation::create(), &enclosing_namespace(&entry.id)).await?;

    let id = state.authz.create_policy(&ctx, &entry).await?;

    Ok((StatusCode::CREATED, Json(CreationResponse { id })))
}

/// GET /authz/policies/{path...}
pub async fn get_policy(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<AuthorizationPolicyEntry>, ApiError> {
    state.authz.allowed(&ctx, &Operation::read(), &enclosing_namespace(&id)).await?;

    let policy = state.authz.get_policy(&ctx, &id).await?;

    Ok(Json(policy))
}

/// DELETE /authz/policies/{path...}
pub async fn delete_policy(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.authz.allowed(&ctx, &Operation::delete(), &enclosing_namespace(&id)).await?;

    state.authz.delete_policy(&ctx, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The namespace a policy id is rooted in: `a/b/p` belongs to `/a/b`.
fn enclosing_namespace(policy_id: &str) -> String {
    let policy_path = codec::policy_id_to_path(policy_id);
    let policies_dir = codec::parent_path(&policy_path);
    codec::parent_path(policies_dir).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enclosing_namespace() {
        assert_eq!(enclosing_namespace("p"), "/");
        assert_eq!(enclosing_namespace("a/p"), "/a");
        assert_eq!(enclosing_namespace("a/b/p"), "/a/b");
    }
}
