//! Admin area endpoints. Reaching these at all requires the admin role; the
//! access policy enforces that before any handler runs.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use crate::AppState;
use crate::auth::Auth;
use crate::db::UserSummary;
use crate::security_log::{self, ClientInfo};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route("/system", get(system_info))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    message: &'static str,
    admin_user: String,
    total_users: i64,
    active_sessions: i64,
}

async fn dashboard(
    State(state): State<AppState>,
    Auth(admin): Auth,
    client: ClientInfo,
) -> Result<impl IntoResponse, ApiError> {
    let total_users = state.db.users().count().await.db_err("Failed to count users")?;
    let active_sessions = state
        .db
        .refresh_tokens()
        .count_active()
        .await
        .db_err("Failed to count sessions")?;

    security_log::admin_access(admin.email(), "dashboard", &client);

    Ok(Json(DashboardResponse {
        message: "Admin dashboard",
        admin_user: admin.email().to_string(),
        total_users,
        active_sessions,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserListResponse {
    message: &'static str,
    requested_by: String,
    users: Vec<UserSummary>,
    user_count: usize,
}

async fn list_users(
    State(state): State<AppState>,
    Auth(admin): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list_all().await.db_err("Failed to list users")?;

    Ok(Json(UserListResponse {
        message: "All registered users",
        requested_by: admin.email().to_string(),
        user_count: users.len(),
        users,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemInfoResponse {
    message: &'static str,
    admin_user: String,
    system_health: &'static str,
    version: &'static str,
}

async fn system_info(Auth(admin): Auth) -> impl IntoResponse {
    Json(SystemInfoResponse {
        message: "System configuration and security information",
        admin_user: admin.email().to_string(),
        system_health: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
