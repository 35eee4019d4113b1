//! Axum extractors for the request identity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::policy::PolicyError;
use super::types::AuthenticatedUser;

/// Extractor for handlers that require an authenticated identity.
///
/// The identity is whatever the authentication filter established; this
/// extractor never performs token work itself.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = PolicyError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or(PolicyError::Unauthenticated)
    }
}

/// Optional identity extractor - never fails.
/// For handlers that behave differently for authenticated callers.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(
            parts.extensions.get::<AuthenticatedUser>().cloned(),
        ))
    }
}
