//! Password hashing and verification via bcrypt.
//!
//! Stored credentials are always bcrypt hashes; plaintext never touches the
//! database or a comparison.

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, BCRYPT_COST)
}

/// Verify a password against a stored hash.
///
/// A malformed stored hash counts as a mismatch rather than an error; the
/// caller only ever learns "matched or not".
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
