//! Secret management. Operations are gated on the parent namespace of
//! the secret's canonical path.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use sealbox_model::{CreationResponse, Operation, RequestContext, SecretEntry};
use sealbox_vds::codec;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /secrets
pub async fn create_secret(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(entry): Json<SecretEntry>,
) -> Result<(StatusCode, Json<CreationResponse>), ApiError> {
    state.authz.allowed(&ctx, &Operation::create(), &gate_path(&entry.id)).await?;

    let id = state.secrets.create_secret(&ctx, &entry).await?;

    Ok((StatusCode::CREATED, Json(CreationResponse { id })))
}

/// GET /secrets/{path...}
pub async fn get_secret(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Json<SecretEntry>, ApiError> {
    state.authz.allowed(&ctx, &Operation::read(), &gate_path(&id)).await?;

    let secret = state.secrets.get_secret(&ctx, &id).await?;

    Ok(Json(secret))
}

/// DELETE /secrets/{path...}
pub async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.authz.allowed(&ctx, &Operation::delete(), &gate_path(&id)).await?;

    state.secrets.delete_secret(&ctx, &id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The parent namespace of the secret's canonical path. A create
/// without an id is gated at `/secrets` itself.
fn gate_path(secret_id: &str) -> String {
    if secret_id.is_empty() {
        return "/secrets".to_string();
    }
    codec::parent_path(&codec::secret_id_to_path(secret_id)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_path() {
        assert_eq!(gate_path(""), "/secrets");
        assert_eq!(gate_path("s1"), "/secrets");
        assert_eq!(gate_path("db/password"), "/secrets/db");
    }
}
