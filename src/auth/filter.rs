//! Per-request bearer token authentication.
//!
//! Runs once for every inbound request outside the exempt list. Extraction
//! and validation failures are recovered locally and only logged; the request
//! always continues, authenticated or not. Rejection happens later, in the
//! access policy.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::types::AuthenticatedUser;
use crate::AppState;
use crate::jwt::AccessClaims;
use crate::security_log::{self, ClientInfo};

/// Paths that skip token extraction entirely: login, registration, and
/// test/health probes.
const EXEMPT_PREFIXES: &[&str] = &["/auth/login", "/auth/register", "/test"];

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Middleware that reconstructs an authenticated identity from a bearer
/// token, when one is present and valid.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let token = bearer_token(request.headers()).map(str::to_string);
    if let Some(token) = token {
        match state.jwt.decode(&token) {
            Ok(claims) => {
                // An identity may only be established once per request.
                if request.extensions().get::<AuthenticatedUser>().is_none() {
                    match resolve_identity(&state, &token, claims).await {
                        Ok(Some(user)) => {
                            debug!(user = %user.email(), "Bearer token authenticated");
                            request.extensions_mut().insert(user);
                        }
                        Ok(None) => {
                            let client = ClientInfo::from_request(&request);
                            security_log::token_rejected("token validation failed", &client);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Identity lookup failed");
                        }
                    }
                }
            }
            Err(_) => {
                let client = ClientInfo::from_request(&request);
                security_log::token_rejected("malformed token or bad signature", &client);
            }
        }
    }

    next.run(request).await
}

/// Pull the token out of the `Authorization` header. Absent header or a
/// non-Bearer scheme yields `None`; neither is an error.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolve the claimed subject to an enabled principal and validate the
/// token against it. `None` means "no identity for this request".
async fn resolve_identity(
    state: &AppState,
    token: &str,
    claims: AccessClaims,
) -> Result<Option<AuthenticatedUser>, sqlx::Error> {
    let Some(user) = state.db.users().get_by_email(&claims.sub).await? else {
        return Ok(None);
    };

    if !user.enabled {
        return Ok(None);
    }

    if !state.jwt.validate(token, &user.email) {
        return Ok(None);
    }

    Ok(Some(AuthenticatedUser {
        claims,
        user_id: user.id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/auth/login"));
        assert!(is_exempt("/auth/register"));
        assert!(is_exempt("/test/ping"));
        assert!(!is_exempt("/auth/logout"));
        assert!(!is_exempt("/auth/refresh"));
        assert!(!is_exempt("/books"));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
