mod common;

use axum::http::StatusCode;
use common::{body_json, request_builder, session_cookie, set_cookies, TestApp, COOKIE_NAME};
use serde_json::json;

#[tokio::test]
async fn test_register_then_login_with_different_case() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/auth/register",
            json!({
                "name": "Alice",
                "email": "alice@example.com",
                "password": "Secret123"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_json(
            "/auth/login",
            json!({ "email": "ALICE@Example.com", "password": "Secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = session_cookie(&response).expect("session cookie set");
    assert!(cookie.starts_with(&format!("{}=", COOKIE_NAME)));
    let raw = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with(COOKIE_NAME))
        .unwrap();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));
    assert!(raw.contains("Path=/"));

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["role"], "student");
    assert_eq!(body["redirect"], "/dashboard/student");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_wrong_password_matches_unknown_email() {
    let app = TestApp::spawn().await;
    app.seed_credentials("bob@example.com", "CorrectHorse1", "Bob")
        .await;

    let wrong = app
        .post_json(
            "/auth/login",
            json!({ "email": "bob@example.com", "password": "nope-nope" }),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&wrong).is_none());
    let wrong_body = body_json(wrong).await;

    let unknown = app
        .post_json(
            "/auth/login",
            json!({ "email": "nobody@example.com", "password": "nope-nope" }),
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = body_json(unknown).await;

    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_missing_fields_is_bad_request() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json("/auth/login", json!({ "email": "a@example.com" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json("/auth/login", json!({ "email": "", "password": "x" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json("/auth/login", json!({ "email": null, "password": "x" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());

    let response = app
        .post_json(
            "/auth/login",
            json!({ "email": "a@example.com", "password": null }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inactive_account_cannot_sign_in() {
    let app = TestApp::spawn().await;
    app.seed_credentials("carol@example.com", "Secret123", "Carol")
        .await;
    app.store.set_active("carol@example.com", false);

    let response = app
        .post_json(
            "/auth/login",
            json!({ "email": "carol@example.com", "password": "Secret123" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
}

#[tokio::test]
async fn test_oauth_only_account_rejects_password() {
    let app = TestApp::spawn().await;
    let profile = common::google_profile("gina@example.com", None);
    app.state
        .auth
        .sign_in(&school_auth_service::services::OAuthSource::new(profile))
        .await
        .expect("provider sign-in");

    let response = app
        .post_json(
            "/auth/login",
            json!({ "email": "gina@example.com", "password": "whatever1" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_endpoint_reflects_cookie() {
    let app = TestApp::spawn().await;
    app.seed_credentials("dan@example.com", "Secret123", "Dan")
        .await;

    let anonymous = app.get("/auth/session", None).await;
    assert_eq!(anonymous.status(), StatusCode::OK);
    assert!(session_cookie(&anonymous).is_none());
    assert_eq!(body_json(anonymous).await, serde_json::Value::Null);

    let cookie = app.login("dan@example.com", "Secret123").await;
    let response = app.get("/auth/session", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_some(), "session slides forward");

    let body = body_json(response).await;
    assert_eq!(body["user"]["email"], "dan@example.com");
    assert_eq!(body["user"]["name"], "Dan");
    assert_eq!(body["user"]["role"], "student");
    assert!(body["user"]["id"].is_string());
    assert!(body["expires"].is_string());
}

#[tokio::test]
async fn test_deactivated_account_loses_session() {
    let app = TestApp::spawn().await;
    app.seed_credentials("fay@example.com", "Secret123", "Fay")
        .await;
    let cookie = app.login("fay@example.com", "Secret123").await;

    app.store.set_active("fay@example.com", false);

    let response = app.get("/auth/session", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none(), "no refreshed cookie");
    let removal = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", COOKIE_NAME)))
        .expect("cookie cleared");
    assert!(removal.contains("Max-Age=0"));
    assert_eq!(body_json(response).await, serde_json::Value::Null);

    let response = app.get("/users/me", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_cookie_reads_as_signed_out() {
    let app = TestApp::spawn().await;
    app.seed_credentials("erin@example.com", "Secret123", "Erin")
        .await;

    let cookie = app.login("erin@example.com", "Secret123").await;
    let tampered = format!("{}x", cookie);

    let response = app.get("/auth/session", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::Value::Null);

    let garbage = format!("{}=garbage", COOKIE_NAME);
    let response = app.get("/auth/session", Some(&garbage)).await;
    assert_eq!(body_json(response).await, serde_json::Value::Null);
}

#[tokio::test]
async fn test_signout_clears_cookie() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            request_builder("POST", "/auth/signout")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let removal = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{}=", COOKIE_NAME)))
        .expect("removal cookie");
    assert!(removal.contains("Max-Age=0"));
    assert!(session_cookie(&response).is_none());

    let body = body_json(response).await;
    assert_eq!(body["message"], "Signed out");
}
