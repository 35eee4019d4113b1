mod admin;
mod auth;
mod error;
mod home;
mod library;
mod users;

use axum::{Json, Router, http::StatusCode, middleware, response::IntoResponse};

use crate::AppState;
use crate::auth::{authenticate, enforce_policy};

/// Create the full application router, with the authentication filter and
/// the access policy layered around every route (including the fallback, so
/// unmatched paths still require an identity).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(home::router(state.clone()))
        .nest("/auth", auth::router(state.clone()))
        .nest("/admin", admin::router(state.clone()))
        .nest("/users", users::router(state.clone()))
        .nest("/books", library::books_router(state.clone()))
        .nest("/loans", library::loans_router(state.clone()))
        .nest("/authors", library::authors_router(state.clone()))
        .fallback(not_found)
        .layer(middleware::from_fn(enforce_policy))
        .layer(middleware::from_fn_with_state(state, authenticate))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not found" })),
    )
}
