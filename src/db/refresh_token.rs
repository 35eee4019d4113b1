//! Refresh token storage.
//!
//! At most one live refresh token exists per principal: creation replaces any
//! prior row inside a single transaction, and the UNIQUE constraint on
//! `user_id` backs the invariant at the storage layer. Rotation is
//! read-then-delete-then-insert, never an in-place update, so a rotated token
//! always carries a fresh value and a fresh expiry.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sqlx::sqlite::SqlitePool;
use std::time::{SystemTime, UNIX_EPOCH};

/// Refresh token duration: 7 days.
pub const REFRESH_TOKEN_DURATION_SECS: i64 = 7 * 24 * 60 * 60;

/// A stored refresh token row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    /// Opaque random token value, unique across all rows
    pub token: String,
    pub user_id: i64,
    /// Expiry as Unix seconds, always creation time + 7 days
    pub expires_at: i64,
    pub created_at: String,
}

/// Store for managing refresh tokens.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a refresh token for a user, replacing any existing one.
    ///
    /// The delete and insert run in one transaction so concurrent logins for
    /// the same principal never leave two live rows.
    pub async fn create(&self, user_id: i64) -> Result<RefreshToken, sqlx::Error> {
        let token = new_token_value();
        let expires_at = unix_now() + REFRESH_TOKEN_DURATION_SECS;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let row: RefreshToken = sqlx::query_as(
            "INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES (?, ?, ?)
             RETURNING id, token, user_id, expires_at, created_at",
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(row)
    }

    /// Look up a refresh token by its opaque value.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, token, user_id, expires_at, created_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Check that a token row has not expired.
    ///
    /// An expired row is deleted on the spot and `Expired` is returned, so a
    /// stale token can never be verified twice.
    pub async fn verify_not_expired(
        &self,
        row: RefreshToken,
    ) -> Result<RefreshToken, RefreshTokenError> {
        if unix_now() > row.expires_at {
            self.delete_by_token(&row.token)
                .await
                .map_err(RefreshTokenError::Database)?;
            return Err(RefreshTokenError::Expired);
        }
        Ok(row)
    }

    /// Rotate a refresh token: verify it is live, then replace it with a new
    /// value and a fresh 7-day expiry for the same user.
    pub async fn rotate(&self, row: RefreshToken) -> Result<RefreshToken, RefreshTokenError> {
        let row = self.verify_not_expired(row).await?;
        self.create(row.user_id)
            .await
            .map_err(RefreshTokenError::Database)
    }

    /// Delete the refresh token for a user, if any. Idempotent.
    pub async fn delete_for_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a refresh token by its value.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired rows. Housekeeping only; expired rows are also
    /// removed eagerly when verification touches them.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(unix_now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count live (unexpired) refresh tokens.
    pub async fn count_active(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE expires_at >= ?")
                .bind(unix_now())
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }
}

/// Generate a new opaque token value: 32 random bytes, base64url encoded.
fn new_token_value() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Errors from refresh token verification and rotation.
#[derive(Debug)]
pub enum RefreshTokenError {
    /// Token is past its expiry (the row has been deleted)
    Expired,
    /// Underlying storage failure
    Database(sqlx::Error),
}

impl std::fmt::Display for RefreshTokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshTokenError::Expired => write!(f, "Refresh token has expired"),
            RefreshTokenError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for RefreshTokenError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, UserRole};

    async fn test_db_with_user() -> (Database, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create("alice@example.com", "h", None, None, UserRole::User)
            .await
            .unwrap();
        (db, id)
    }

    async fn row_count(db: &Database, user_id: i64) -> i64 {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(db.pool())
                .await
                .unwrap();
        count.0
    }

    async fn force_expire(db: &Database, token: &str) {
        sqlx::query("UPDATE refresh_tokens SET expires_at = ? WHERE token = ?")
            .bind(unix_now() - 1)
            .bind(token)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_sets_seven_day_expiry() {
        let (db, user_id) = test_db_with_user().await;

        let before = unix_now();
        let row = db.refresh_tokens().create(user_id).await.unwrap();
        let after = unix_now();

        assert!(row.expires_at >= before + REFRESH_TOKEN_DURATION_SECS);
        assert!(row.expires_at <= after + REFRESH_TOKEN_DURATION_SECS);
        assert!(!row.token.is_empty());
    }

    #[tokio::test]
    async fn test_create_replaces_existing_row() {
        let (db, user_id) = test_db_with_user().await;

        let first = db.refresh_tokens().create(user_id).await.unwrap();
        let second = db.refresh_tokens().create(user_id).await.unwrap();

        assert_ne!(first.token, second.token);
        assert_eq!(row_count(&db, user_id).await, 1);

        // The first token is gone.
        assert!(
            db.refresh_tokens()
                .get_by_token(&first.token)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            db.refresh_tokens()
                .get_by_token(&second.token)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_rotate_returns_new_value_and_expiry() {
        let (db, user_id) = test_db_with_user().await;

        let old = db.refresh_tokens().create(user_id).await.unwrap();
        let new = db.refresh_tokens().rotate(old.clone()).await.unwrap();

        assert_ne!(old.token, new.token);
        assert_eq!(new.user_id, user_id);
        assert_eq!(row_count(&db, user_id).await, 1);
        assert!(
            db.refresh_tokens()
                .get_by_token(&old.token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rotate_expired_fails_and_deletes_row() {
        let (db, user_id) = test_db_with_user().await;

        let row = db.refresh_tokens().create(user_id).await.unwrap();
        force_expire(&db, &row.token).await;

        let fetched = db
            .refresh_tokens()
            .get_by_token(&row.token)
            .await
            .unwrap()
            .unwrap();
        let result = db.refresh_tokens().rotate(fetched).await;

        assert!(matches!(result, Err(RefreshTokenError::Expired)));
        assert_eq!(row_count(&db, user_id).await, 0);
    }

    #[tokio::test]
    async fn test_verify_not_expired_passes_live_row_through() {
        let (db, user_id) = test_db_with_user().await;

        let row = db.refresh_tokens().create(user_id).await.unwrap();
        let verified = db
            .refresh_tokens()
            .verify_not_expired(row.clone())
            .await
            .unwrap();

        assert_eq!(verified.token, row.token);
        assert_eq!(verified.expires_at, row.expires_at);
    }

    #[tokio::test]
    async fn test_delete_for_user_is_idempotent() {
        let (db, user_id) = test_db_with_user().await;

        db.refresh_tokens().create(user_id).await.unwrap();
        assert_eq!(db.refresh_tokens().delete_for_user(user_id).await.unwrap(), 1);
        assert_eq!(db.refresh_tokens().delete_for_user(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_expired_leaves_live_rows() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db
            .users()
            .create("alice@example.com", "h", None, None, UserRole::User)
            .await
            .unwrap();
        let bob = db
            .users()
            .create("bob@example.com", "h", None, None, UserRole::User)
            .await
            .unwrap();

        let stale = db.refresh_tokens().create(alice).await.unwrap();
        db.refresh_tokens().create(bob).await.unwrap();
        force_expire(&db, &stale.token).await;

        assert_eq!(db.refresh_tokens().delete_expired().await.unwrap(), 1);
        assert_eq!(db.refresh_tokens().count_active().await.unwrap(), 1);
    }
}
