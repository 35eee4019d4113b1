//! Authentication endpoints.
//!
//! - POST `/login` - Verify credentials, issue access + refresh tokens
//! - POST `/refresh` - Exchange a refresh token for new tokens (rotating)
//! - POST `/logout` - Delete the refresh token; best-effort, always succeeds
//! - POST `/register` - Create a new account
//! - GET `/me` - Current principal's profile

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ApiError, ResultExt};
use crate::AppState;
use crate::auth::{Auth, CredentialError, OptionalAuth, verify_credentials};
use crate::db::{RefreshTokenError, User, UserRole};
use crate::password;
use crate::security_log::{self, ClientInfo};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/me", get(me))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Issued token pair plus the principal's public attributes.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: &'static str,
    email: String,
    role: UserRole,
    user_id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl TokenResponse {
    fn new(access_token: String, refresh_token: String, user: &User) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer",
            email: user.email.clone(),
            role: user.role,
            user_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = match verify_credentials(&state.db.users(), &payload.email, &payload.password).await
    {
        Ok(user) => user,
        Err(CredentialError::InvalidCredentials) => {
            security_log::login_failed(&payload.email, "invalid credentials", &client);
            return Err(ApiError::unauthorized("Invalid email or password"));
        }
        Err(CredentialError::Database(e)) => {
            return Err(ApiError::internal("Failed to verify credentials", e));
        }
    };

    let access = state
        .jwt
        .issue(&user.email, user.role)
        .map_err(|e| ApiError::internal("Failed to issue access token", e))?;

    let refresh = state
        .db
        .refresh_tokens()
        .create(user.id)
        .await
        .db_err("Failed to create refresh token")?;

    security_log::login_succeeded(&user.email, &client);
    if user.role == UserRole::Admin {
        security_log::admin_access(&user.email, "login", &client);
    }

    Ok((
        StatusCode::OK,
        Json(TokenResponse::new(access.token, refresh.token, &user)),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

async fn refresh(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .refresh_tokens()
        .get_by_token(&payload.refresh_token)
        .await
        .db_err("Failed to look up refresh token")?
        .ok_or_else(|| {
            security_log::token_rejected("unknown refresh token", &client);
            ApiError::unauthorized("Unknown refresh token")
        })?;

    let user = state
        .db
        .users()
        .get_by_id(row.user_id)
        .await
        .db_err("Failed to look up token owner")?
        .ok_or_else(|| ApiError::unauthorized("Unknown refresh token"))?;

    if !user.enabled {
        security_log::token_rejected("refresh for disabled account", &client);
        return Err(ApiError::unauthorized("Account is disabled"));
    }

    let rotated = match state.db.refresh_tokens().rotate(row).await {
        Ok(row) => row,
        Err(RefreshTokenError::Expired) => {
            security_log::token_rejected("expired refresh token", &client);
            return Err(ApiError::unauthorized("Refresh token has expired"));
        }
        Err(RefreshTokenError::Database(e)) => {
            return Err(ApiError::internal("Failed to rotate refresh token", e));
        }
    };

    let access = state
        .jwt
        .issue(&user.email, user.role)
        .map_err(|e| ApiError::internal("Failed to issue access token", e))?;

    Ok((
        StatusCode::OK,
        Json(TokenResponse::new(access.token, rotated.token, &user)),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct LogoutResponse {
    message: &'static str,
}

/// Logout is best-effort and idempotent: the matching refresh token row is
/// deleted when one can be found, and the call succeeds regardless.
///
/// The body is optional, so it is parsed leniently: no body, an empty body,
/// or a body without a token all fall back to the authenticated identity.
async fn logout(
    State(state): State<AppState>,
    OptionalAuth(identity): OptionalAuth,
    client: ClientInfo,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let store = state.db.refresh_tokens();
    let submitted_token = serde_json::from_slice::<LogoutRequest>(&body)
        .ok()
        .and_then(|req| req.refresh_token)
        .filter(|t| !t.is_empty());

    let result = match (&submitted_token, &identity) {
        (Some(token), _) => match store.get_by_token(token).await {
            Ok(Some(row)) => store.delete_for_user(row.user_id).await.map(|_| ()),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        (None, Some(user)) => store.delete_for_user(user.user_id).await.map(|_| ()),
        (None, None) => Ok(()),
    };

    if let Err(e) = result {
        warn!(error = %e, "Logout cleanup failed");
    }

    let subject = identity
        .as_ref()
        .map(|u| u.email())
        .unwrap_or("unknown")
        .to_string();
    security_log::logout(&subject, &client);

    (
        StatusCode::OK,
        Json(LogoutResponse {
            message: "Logged out",
        }),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    message: &'static str,
    user_id: i64,
    email: String,
}

async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required"));
    }
    if email.len() > 254 {
        return Err(ApiError::bad_request("Email address is too long"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    if state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to check email availability")?
        .is_some()
    {
        return Err(ApiError::conflict(
            "An account with this email already exists",
        ));
    }

    let hash = password::hash_password(&payload.password)
        .map_err(|e| ApiError::internal("Failed to hash password", e))?;

    // New accounts always start as regular users.
    let user_id = state
        .db
        .users()
        .create(
            email,
            &hash,
            payload.first_name.as_deref(),
            payload.last_name.as_deref(),
            UserRole::User,
        )
        .await
        .map_err(|e| {
            // Lost a race against a concurrent registration with the same email.
            if e.as_database_error()
                .is_some_and(|d| d.is_unique_violation())
            {
                ApiError::conflict("An account with this email already exists")
            } else {
                ApiError::internal("Failed to create user", e)
            }
        })?;

    security_log::registration(email, &client);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created",
            user_id,
            email: email.to_string(),
        }),
    ))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email: String,
    role: UserRole,
    user_id: i64,
    first_name: Option<String>,
    last_name: Option<String>,
    registration_date: String,
}

async fn me(
    State(state): State<AppState>,
    Auth(identity): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(identity.email())
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok(Json(ProfileResponse {
        email: user.email,
        role: user.role,
        user_id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        registration_date: user.registration_date,
    }))
}
