mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{TestApp, ALICE, CAROL};

const PROTECTED: &[(&str, &str)] = &[
    ("GET", "/me"),
    ("GET", "/clients"),
    ("GET", "/datasets"),
    ("POST", "/datasets/create"),
    ("GET", "/datasets/some-id"),
    ("POST", "/datasets/some-id/files"),
    ("POST", "/datasets/some-id/process"),
];

#[tokio::test]
async fn protected_routes_require_bearer_token() -> Result<()> {
    let app = TestApp::new().await;

    for (method, path) in PROTECTED {
        let (status, body) = app.request(method, path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {} -> {}", method, path, body);
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Authorization header missing");
    }
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() -> Result<()> {
    let app = TestApp::new().await;

    let (status, body) = app.request("GET", "/me", None, Some("Basic dXNlcjpwYXNz")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authorization header must be a Bearer token");
    Ok(())
}

#[tokio::test]
async fn forged_token_is_rejected() -> Result<()> {
    let app = TestApp::new().await;

    let forged = intake_api::auth::JwtSecretVerifier::new("some-other-secret-0123456789abcdef")
        .issue(&intake_api::auth::Claims::new(ALICE, None, chrono::Duration::minutes(5)))?;
    let (status, body) = app
        .request("GET", "/me", None, Some(&format!("Bearer {}", forged)))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
    Ok(())
}

#[tokio::test]
async fn me_returns_resolved_caller() -> Result<()> {
    let app = TestApp::new().await;

    let (status, body) = app.request_as(ALICE, "GET", "/me", None).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user_id"], ALICE);
    assert_eq!(body["data"]["app_user_id"], "user-alice");
    assert_eq!(body["data"]["firm_id"], "firm-a");
    assert_eq!(body["data"]["email"], "auth-alice@firm.test");
    Ok(())
}

#[tokio::test]
async fn unprovisioned_user_is_forbidden() -> Result<()> {
    let app = TestApp::new().await;

    let (status, body) = app.request_as(CAROL, "GET", "/me", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
    Ok(())
}
