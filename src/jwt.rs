//! Access token encoding, decoding, and validation.
//!
//! Access tokens are short-lived (15 minutes), stateless HS256 JWTs carrying
//! the principal's email and role. Decoding and expiry checking are split on
//! purpose: `decode` only verifies shape and signature, `validate` is the one
//! place that compares the subject and the clock.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::UserRole;

/// Access token duration: 15 minutes.
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (the principal's email)
    pub sub: String,
    /// Role carried into authorization decisions
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp, always `iat` + 15 minutes)
    pub exp: u64,
}

/// Result of issuing an access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// Signing configuration built once at startup from an injected secret.
///
/// The secret comes from configuration (env var or file), never generated in
/// process, so a restart with the same secret keeps outstanding tokens valid.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtConfig {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue an access token for the given principal.
    pub fn issue(&self, email: &str, role: UserRole) -> Result<IssuedToken, JwtError> {
        self.issue_at(email, role, unix_now()?)
    }

    /// Issue an access token with an explicit issue time.
    pub fn issue_at(&self, email: &str, role: UserRole, now: u64) -> Result<IssuedToken, JwtError> {
        let claims = AccessClaims {
            sub: email.to_string(),
            role,
            iat: now,
            exp: now + ACCESS_TOKEN_DURATION_SECS,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_in: ACCESS_TOKEN_DURATION_SECS,
        })
    }

    /// Decode a token and verify its signature. Does NOT check expiry;
    /// that is `validate`'s job.
    ///
    /// Strings that are not three dot-separated segments are rejected before
    /// any signature verification is attempted.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, JwtError> {
        if token.split('.').count() != 3 {
            return Err(JwtError::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
                .map_err(|_| JwtError::Malformed)?;

        Ok(token_data.claims)
    }

    /// Check a token against the expected principal.
    ///
    /// True iff the token decodes, its subject equals `expected_subject`, and
    /// the current time is strictly before expiry. Never errors: malformed,
    /// mismatched, and expired tokens all yield `false`.
    pub fn validate(&self, token: &str, expected_subject: &str) -> bool {
        let Ok(now) = unix_now() else {
            return false;
        };
        self.validate_at(token, expected_subject, now)
    }

    /// `validate` with an explicit clock. `now == exp` counts as expired.
    pub fn validate_at(&self, token: &str, expected_subject: &str, now: u64) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.sub == expected_subject && now < claims.exp,
            Err(_) => false,
        }
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Structurally invalid token or bad signature
    Malformed,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Malformed => write!(f, "Malformed token"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
