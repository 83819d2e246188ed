//! The whitelisted login endpoint. Phase one returns an encrypted
//! challenge, phase two a bearer token; both travel in the same
//! response field.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use sealbox_model::{LoginRequest, LoginResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let challenge_or_token = state.authn.login(&request).await?;

    Ok(Json(LoginResponse { challenge_or_token }))
}
