//! User management. All operations are gated on the `/users`
//! namespace.

use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use sealbox_model::{CreationResponse, Operation, RequestContext, UserEntry};

use crate::error::ApiError;
use crate::state::AppState;

const USERS_NAMESPACE: &str = "/users";

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(entry): Json<UserEntry>,
) -> Result<(StatusCode, Json<CreationResponse>), ApiError> {
    state.authz.allowed(&ctx, &Operation::create(), USERS_NAMESPACE).await?;

    let id = state.authn.create_user(&entry).await?;

    Ok((StatusCode::CREATED, Json(CreationResponse { id })))
}

/// GET /users/{username}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
) -> Result<Json<UserEntry>, ApiError> {
    state.authz.allowed(&ctx, &Operation::read(), USERS_NAMESPACE).await?;

    let user = state.authn.get_user(&username).await?;

    Ok(Json(user))
}

/// DELETE /users/{username}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(username): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.authz.allowed(&ctx, &Operation::delete(), USERS_NAMESPACE).await?;

    state.authn.delete_user(&username).await?;

    Ok(StatusCode::NO_CONTENT)
}
