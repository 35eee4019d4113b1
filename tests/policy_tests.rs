//! Tests for the request authentication filter and the access policy.
//!
//! The filter never rejects on its own: bad or missing tokens leave the
//! request unauthenticated and the policy decides. These tests exercise the
//! 401/403 split and the public/role-gated path groups end to end.

mod common;

use axum::http::StatusCode;
use common::*;
use shelfgate::db::UserRole;
use shelfgate::jwt::ACCESS_TOKEN_DURATION_SECS;
use tower::ServiceExt;

#[tokio::test]
async fn test_public_paths_need_no_identity() {
    let (app, _, _) = create_test_app().await;

    for uri in ["/", "/home", "/public/info", "/test/ping"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
    }
}

#[tokio::test]
async fn test_home_reports_anonymous_caller() {
    let (app, _, _) = create_test_app().await;

    let response = app.oneshot(get("/")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn test_home_reports_authenticated_caller() {
    let (app, db, _) = create_test_app().await;
    create_user(&db, "alice@example.com", "password123", UserRole::User).await;

    let tokens = login(&app, "alice@example.com", "password123").await;
    let access = tokens["accessToken"].as_str().unwrap();

    let response = app.oneshot(get_with_token("/", access)).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"], "alice@example.com");
}

#[tokio::test]
async fn test_admin_path_without_identity_is_unauthenticated() {
    let (app, _, _) = create_test_app().await;

    let response = app.oneshot(get("/admin/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_user_role_on_admin_path_is_forbidden() {
    let (app, db, _) = create_test_app().await;
    create_user(&db, "alice@example.com", "password123", UserRole::User).await;

    let tokens = login(&app, "alice@example.com", "password123").await;
    let access = tokens["accessToken"].as_str().unwrap();

    for uri in ["/admin/dashboard", "/users", "/authors"] {
        let response = app.clone().oneshot(get_with_token(uri, access)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri {uri}");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Insufficient permissions");
    }
}

#[tokio::test]
async fn test_admin_role_reaches_admin_area() {
    let (app, db, _) = create_test_app().await;
    create_user(&db, "root@example.com", "admin-password", UserRole::Admin).await;

    let tokens = login(&app, "root@example.com", "admin-password").await;
    let access = tokens["accessToken"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(get_with_token("/admin/dashboard", access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["adminUser"], "root@example.com");

    let response = app
        .oneshot(get_with_token("/users", access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["userCount"], 1);
}

#[tokio::test]
async fn test_library_paths_accept_both_roles() {
    let (app, db, _) = create_test_app().await;
    create_user(&db, "alice@example.com", "password123", UserRole::User).await;
    create_user(&db, "root@example.com", "admin-password", UserRole::Admin).await;

    let user_tokens = login(&app, "alice@example.com", "password123").await;
    let admin_tokens = login(&app, "root@example.com", "admin-password").await;

    for tokens in [&user_tokens, &admin_tokens] {
        let access = tokens["accessToken"].as_str().unwrap();
        for uri in ["/books", "/loans"] {
            let response = app.clone().oneshot(get_with_token(uri, access)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
        }
    }
}

#[tokio::test]
async fn test_library_path_without_identity_is_unauthenticated() {
    let (app, _, _) = create_test_app().await;

    let response = app.oneshot(get("/books")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_bearer_token_leaves_request_unauthenticated() {
    let (app, _, _) = create_test_app().await;

    // Malformed tokens are swallowed by the filter; the policy rejects.
    let response = app
        .clone()
        .oneshot(get_with_token("/books", "not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // A malformed token on a public path does not break the request.
    let response = app
        .oneshot(get_with_token("/public/info", "not-a-jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_auth_scheme_is_ignored() {
    let (app, _, _) = create_test_app().await;

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/books")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_access_token_is_rejected_by_policy() {
    let (app, db, jwt) = create_test_app().await;
    create_user(&db, "alice@example.com", "password123", UserRole::User).await;

    // Issued long enough ago that it is already past expiry.
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let issued = jwt
        .issue_at(
            "alice@example.com",
            UserRole::User,
            now - ACCESS_TOKEN_DURATION_SECS - 10,
        )
        .unwrap();

    let response = app
        .oneshot(get_with_token("/books", &issued.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_disabled_user_is_rejected() {
    let (app, db, _) = create_test_app().await;
    let user_id = create_user(&db, "alice@example.com", "password123", UserRole::User).await;

    let tokens = login(&app, "alice@example.com", "password123").await;
    let access = tokens["accessToken"].as_str().unwrap();
    db.users().set_enabled(user_id, false).await.unwrap();

    let response = app.oneshot(get_with_token("/books", access)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_subject_is_rejected() {
    let (app, _, jwt) = create_test_app().await;

    // Well-signed token, but the subject does not exist.
    let issued = jwt.issue("ghost@example.com", UserRole::Admin).unwrap();

    let response = app
        .oneshot(get_with_token("/admin/dashboard", &issued.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unmatched_path_requires_identity() {
    let (app, db, _) = create_test_app().await;
    create_user(&db, "alice@example.com", "password123", UserRole::User).await;

    // No identity: the policy fallback rejects before routing.
    let response = app.clone().oneshot(get("/no-such-area")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // With an identity the request reaches the router and 404s.
    let tokens = login(&app, "alice@example.com", "password123").await;
    let access = tokens["accessToken"].as_str().unwrap();
    let response = app
        .oneshot(get_with_token("/no-such-area", access))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_me_requires_identity() {
    let (app, db, _) = create_test_app().await;
    create_user(&db, "alice@example.com", "password123", UserRole::User).await;

    let response = app.clone().oneshot(get("/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let tokens = login(&app, "alice@example.com", "password123").await;
    let access = tokens["accessToken"].as_str().unwrap();
    let response = app.oneshot(get_with_token("/auth/me", access)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "user");
}
