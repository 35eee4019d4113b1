#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, header};
use shelfgate::db::{Database, UserRole};
use shelfgate::jwt::JwtConfig;
use shelfgate::{ServerConfig, create_app, password};
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

/// Create a test app backed by an in-memory database.
/// Returns (app, db, jwt_config); the jwt config shares the app's secret so
/// tests can mint tokens directly.
pub async fn create_test_app() -> (axum::Router, Database, JwtConfig) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: JWT_SECRET.to_vec(),
    };
    (create_app(&config), db, JwtConfig::new(JWT_SECRET))
}

/// Create a user with a bcrypt-hashed password. Returns the user ID.
pub async fn create_user(db: &Database, email: &str, password: &str, role: UserRole) -> i64 {
    let hash = password::hash_password(password).expect("Failed to hash password");
    db.users()
        .create(email, &hash, Some("Test"), Some("User"), role)
        .await
        .expect("Failed to create user")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_empty_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Read a JSON response body.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

/// Log in and return the parsed token response body.
pub async fn login(app: &axum::Router, email: &str, password: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await
}

/// Count refresh token rows for a user via raw SQL.
pub async fn refresh_row_count(db: &Database, user_id: i64) -> i64 {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    count.0
}
