//! Path-based access control policy.
//!
//! Ordered rule evaluation over the request path, first match wins. The
//! policy is the single place where unauthenticated (401) and forbidden
//! (403) responses originate.

use axum::Json;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::types::AuthenticatedUser;
use crate::db::UserRole;
use crate::security_log::{self, ClientInfo};

/// Access requirement for a route group.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    /// No identity required
    Public,
    /// Any authenticated identity
    Authenticated,
    /// Authenticated identity with a role from the set
    Role(&'static [UserRole]),
}

/// Ordered path rules; the first matching prefix decides.
const RULES: &[(&str, Access)] = &[
    ("/home", Access::Public),
    ("/public", Access::Public),
    ("/auth", Access::Public),
    ("/test", Access::Public),
    ("/admin", Access::Role(&[UserRole::Admin])),
    ("/users", Access::Role(&[UserRole::Admin])),
    ("/authors", Access::Role(&[UserRole::Admin])),
    ("/books", Access::Role(&[UserRole::User, UserRole::Admin])),
    ("/loans", Access::Role(&[UserRole::User, UserRole::Admin])),
];

/// Look up what the policy requires for a path. Unmatched paths require an
/// authenticated identity of any role.
pub fn required_access(path: &str) -> Access {
    if path == "/" {
        return Access::Public;
    }
    for (prefix, access) in RULES {
        if matches_prefix(path, prefix) {
            return *access;
        }
    }
    Access::Authenticated
}

/// Prefix match on path-segment boundaries: `/books` matches `/books` and
/// `/books/1` but not `/bookshelf`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Policy rejection. The 401/403 distinction depends on whether an identity
/// was established at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// No identity established for the request
    Unauthenticated,
    /// Identity established but role insufficient
    Forbidden,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for PolicyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PolicyError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Authentication required"),
            PolicyError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Evaluate the policy for a path against the request's identity, if any.
pub fn evaluate(path: &str, identity: Option<&AuthenticatedUser>) -> Result<(), PolicyError> {
    match required_access(path) {
        Access::Public => Ok(()),
        Access::Authenticated => match identity {
            Some(_) => Ok(()),
            None => Err(PolicyError::Unauthenticated),
        },
        Access::Role(allowed) => match identity {
            Some(user) if allowed.contains(&user.role()) => Ok(()),
            Some(_) => Err(PolicyError::Forbidden),
            None => Err(PolicyError::Unauthenticated),
        },
    }
}

/// Middleware enforcing the policy. Layered inside the authentication filter
/// so the identity, when one exists, is already in request extensions.
pub async fn enforce_policy(request: Request, next: Next) -> Response {
    let path = request.uri().path();
    let identity = request.extensions().get::<AuthenticatedUser>();

    match evaluate(path, identity) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            let client = ClientInfo::from_request(&request);
            security_log::access_denied(path, identity.map(|u| u.email()), &client);
            err.into_response()
        }
    }
}
