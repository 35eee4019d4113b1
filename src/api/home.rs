//! Public endpoints: home page, public info, and the health probe.

use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::auth::OptionalAuth;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/public/info", get(public_info))
        .route("/test/ping", get(ping))
        .with_state(state)
}

#[derive(Serialize)]
struct HomeResponse {
    message: &'static str,
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
}

async fn home(OptionalAuth(identity): OptionalAuth) -> impl IntoResponse {
    Json(HomeResponse {
        message: "Welcome to the library management service",
        authenticated: identity.is_some(),
        user: identity.map(|u| u.email().to_string()),
    })
}

#[derive(Serialize)]
struct PublicInfoResponse {
    message: &'static str,
    version: &'static str,
    features: &'static [&'static str],
}

async fn public_info() -> impl IntoResponse {
    Json(PublicInfoResponse {
        message: "Public information about this service",
        version: env!("CARGO_PKG_VERSION"),
        features: &["books", "loans", "user accounts"],
    })
}

#[derive(Serialize)]
struct PingResponse {
    status: &'static str,
}

async fn ping() -> impl IntoResponse {
    Json(PingResponse { status: "ok" })
}
