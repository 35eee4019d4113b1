//! User management endpoints (admin-gated by the access policy).

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use crate::AppState;
use crate::db::{UserRole, UserSummary};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserListResponse {
    users: Vec<UserSummary>,
    user_count: usize,
}

async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list_all().await.db_err("Failed to list users")?;

    Ok(Json(UserListResponse {
        user_count: users.len(),
        users,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDetailResponse {
    user_id: i64,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: UserRole,
    enabled: bool,
    registration_date: String,
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserDetailResponse {
        user_id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        role: user.role,
        enabled: user.enabled,
        registration_date: user.registration_date,
    }))
}
