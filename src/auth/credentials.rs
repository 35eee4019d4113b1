//! Credential verification for login.

use crate::db::{User, UserStore};
use crate::password;

/// Errors from credential verification.
#[derive(Debug)]
pub enum CredentialError {
    /// Unknown email, disabled account, or wrong password. Collapsed into one
    /// variant so callers cannot leak which part failed.
    InvalidCredentials,
    /// Underlying storage failure
    Database(sqlx::Error),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::InvalidCredentials => write!(f, "Invalid email or password"),
            CredentialError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Check a submitted email + password pair against stored credentials.
///
/// Returns the resolved user on success. The password is only ever compared
/// through the bcrypt hash.
pub async fn verify_credentials(
    users: &UserStore,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let user = users
        .get_by_email(email)
        .await
        .map_err(CredentialError::Database)?
        .ok_or(CredentialError::InvalidCredentials)?;

    if !user.enabled {
        return Err(CredentialError::InvalidCredentials);
    }

    if !password::verify_password(password, &user.password_hash) {
        return Err(CredentialError::InvalidCredentials);
    }

    Ok(user)
}
