//! Authenticated identity types.

use crate::db::UserRole;
use crate::jwt::AccessClaims;

/// Identity established for one request by the authentication filter.
///
/// Present in request extensions only after a bearer token decoded, the
/// subject resolved to an enabled user, and the token validated.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Claims from the validated access token
    pub claims: AccessClaims,
    /// Database user ID of the resolved principal
    pub user_id: i64,
}

impl AuthenticatedUser {
    pub fn email(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> UserRole {
        self.claims.role
    }
}
