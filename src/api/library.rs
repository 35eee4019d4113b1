//! Role-gated library area endpoints.
//!
//! Book, loan, and author persistence live outside this service; these
//! handlers are the protected surface the access policy guards, echoing who
//! was let through.

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::auth::Auth;
use crate::db::UserRole;

pub fn books_router(state: AppState) -> Router {
    Router::new().route("/", get(books)).with_state(state)
}

pub fn loans_router(state: AppState) -> Router {
    Router::new().route("/", get(loans)).with_state(state)
}

pub fn authors_router(state: AppState) -> Router {
    Router::new().route("/", get(authors)).with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AreaResponse {
    message: &'static str,
    user: String,
    role: UserRole,
}

async fn books(Auth(user): Auth) -> impl IntoResponse {
    Json(AreaResponse {
        message: "Book catalog",
        user: user.email().to_string(),
        role: user.role(),
    })
}

async fn loans(Auth(user): Auth) -> impl IntoResponse {
    Json(AreaResponse {
        message: "Loan management",
        user: user.email().to_string(),
        role: user.role(),
    })
}

async fn authors(Auth(user): Auth) -> impl IntoResponse {
    Json(AreaResponse {
        message: "Author management",
        user: user.email().to_string(),
        role: user.role(),
    })
}
