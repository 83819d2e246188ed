//! Namespace management. Creation is gated on the parent namespace,
//! reads and deletes on the namespace itself.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use sealbox_model::{CreationResponse, NamespaceEntry, Operation, RequestContext};
use sealbox_vds::codec;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /namespaces
pub async fn create_namespace(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(entry): Json<NamespaceEntry>,
) -> Result<(StatusCode, Json<CreationResponse>), ApiError> {
    let gate = if entry.path == "/" { "/" } else { codec::parent_path(&entry.path) };
    state.authz.allowed(&ctx, &Operation::create(), gate).await?;

    let id = state.namespaces.create_namespace(&entry).await?;

    Ok((StatusCode::CREATED, Json(CreationResponse { id })))
}

/// GET /namespaces/{path...}
pub async fn get_namespace(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(path): Path<String>,
) -> Result<Json<NamespaceEntry>, ApiError> {
    let path = absolute(&path);
    state.authz.allowed(&ctx, &Operation::read(), &path).await?;

    let namespace = state.namespaces.get_namespace(&path).await?;

    Ok(Json(namespace))
}

/// DELETE /namespaces/{path...}
pub async fn delete_namespace(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(path): Path<String>,
) -> Result<StatusCode, ApiError> {
    let path = absolute(&path);
    state.authz.allowed(&ctx, &Operation::delete(), &path).await?;

    state.namespaces.delete_namespace(&path).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// The wildcard segment arrives without its leading slash.
fn absolute(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
