pub mod config;
pub mod state;

mod api;
mod error;
mod middleware;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // User management
        .route("/users", post(api::users::create_user))
        .route(
            "/users/:username",
            get(api::users::get_user).delete(api::users::delete_user),
        )
        // Login (whitelisted in the pre-filter)
        .route("/login", post(api::login::login))
        // Namespaces
        .route("/namespaces", post(api::namespaces::create_namespace))
        .route(
            "/namespaces/*path",
            get(api::namespaces::get_namespace).delete(api::namespaces::delete_namespace),
        )
        // Secrets
        .route("/secrets", post(api::secrets::create_secret))
        .route(
            "/secrets/*path",
            get(api::secrets::get_secret).delete(api::secrets::delete_secret),
        )
        // Authorization policies
        .route("/authz/policies", post(api::policies::create_policy))
        .route(
            "/authz/policies/*path",
            get(api::policies::get_policy).delete(api::policies::delete_policy),
        )
        // Middleware (order matters: last added = first executed)
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
