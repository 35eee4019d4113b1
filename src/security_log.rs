//! Structured security event logging.
//!
//! Write-only sink for authentication outcomes: logins, logouts, denials,
//! registrations, and incidents. Events go to the `security` tracing target
//! (incidents and denials additionally to `audit`) and are consumed by
//! external log tooling; there is no read or query API.

use axum::extract::{ConnectInfo, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, header};
use std::net::SocketAddr;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Maximum User-Agent length recorded per event.
const USER_AGENT_MAX_LEN: usize = 50;

/// Client origin attached to every security event.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    /// Extract the client origin from request headers and extensions.
    ///
    /// The IP comes from `X-Forwarded-For` (first entry) when present, then
    /// `X-Real-IP`, then the socket address. Missing data degrades to
    /// `"unknown"` rather than failing; logging must never block a request.
    pub fn new(headers: &HeaderMap, extensions: &Extensions) -> Self {
        let ip = forwarded_ip(headers)
            .or_else(|| {
                extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ci| ci.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(truncate_user_agent)
            .unwrap_or_else(|| "unknown".to_string());

        Self { ip, user_agent }
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(request.headers(), request.extensions())
    }
}

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientInfo::new(&parts.headers, &parts.extensions))
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = value.split(',').next().map(str::trim).unwrap_or("");
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn truncate_user_agent(ua: &str) -> String {
    ua.chars().take(USER_AGENT_MAX_LEN).collect()
}

pub fn login_succeeded(user: &str, client: &ClientInfo) {
    info!(
        target: "security",
        event = "login_success",
        user = %user,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Login succeeded"
    );
}

pub fn login_failed(user: &str, reason: &str, client: &ClientInfo) {
    warn!(
        target: "security",
        event = "login_failure",
        user = %user,
        reason = %reason,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Login failed"
    );
}

pub fn registration(email: &str, client: &ClientInfo) {
    info!(
        target: "security",
        event = "registration",
        user = %email,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "User registered"
    );
}

pub fn logout(user: &str, client: &ClientInfo) {
    info!(
        target: "security",
        event = "logout",
        user = %user,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Logged out"
    );
}

pub fn admin_access(user: &str, action: &str, client: &ClientInfo) {
    info!(
        target: "security",
        event = "admin_access",
        user = %user,
        action = %action,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Admin access"
    );
}

/// A request was rejected by the access policy.
pub fn access_denied(path: &str, user: Option<&str>, client: &ClientInfo) {
    let user = user.unwrap_or("unknown");
    warn!(
        target: "audit",
        event = "access_denied",
        resource = %path,
        user = %user,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Access denied"
    );
}

/// A bearer token was presented but could not be accepted. The request
/// proceeds unauthenticated; this is a log line, not a rejection.
pub fn token_rejected(reason: &str, client: &ClientInfo) {
    warn!(
        target: "security",
        event = "token_rejected",
        reason = %reason,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Bearer token rejected"
    );
}

/// Record an unexpected failure with full detail and return the correlation
/// id. Callers hand the id to the client; the detail stays server-side.
pub fn incident(context: &str, detail: impl std::fmt::Display) -> String {
    let correlation_id: String = Uuid::new_v4().to_string().chars().take(8).collect();
    error!(
        target: "security",
        event = "incident",
        correlation_id = %correlation_id,
        context = %context,
        detail = %detail,
        "Unexpected failure"
    );
    correlation_id
}
