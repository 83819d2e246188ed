//! The authentication pre-filter: every request outside the whitelist
//! must carry a valid bearer token, and the authenticated caller is
//! attached to the request for the handlers and the authorization
//! gate.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sealbox_model::{Error, RequestContext};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if state.authn.is_whitelisted(request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(auth_header) = auth_header else {
        return ApiError(Error::Unauthorized).into_response();
    };

    match state.authn.authenticated(auth_header) {
        Ok(username) => {
            request.extensions_mut().insert(RequestContext::new(username));
            next.run(request).await
        }
        Err(err) => ApiError(err).into_response(),
    }
}
