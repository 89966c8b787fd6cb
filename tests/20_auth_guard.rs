mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use student_portal::auth::TokenKind;
use student_portal::database::models::user::Role;

async fn assert_unauthorized(res: reqwest::Response) -> Result<()> {
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    for path in ["/api/auth/me", "/api/fees", "/api/library/issues", "/api/dashboard", "/api/notifications"] {
        let res = client.get(server.url(path)).send().await?;
        assert_unauthorized(res).await?;
    }
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/api/auth/me"))
        .header("Authorization", "Basic YWRtaW46YWRtaW4=")
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/api/fees"))
        .bearer_auth("not-a-jwt")
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = server.token(Role::Student, TokenKind::Access, -3600);

    let res = reqwest::Client::new()
        .get(server.url("/api/auth/me"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn refresh_token_cannot_call_the_api() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = server.token(Role::Admin, TokenKind::Refresh, 3600);

    let res = reqwest::Client::new()
        .get(server.url("/api/users"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn access_token_cannot_refresh() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = server.token(Role::Student, TokenKind::Access, 3600);

    let res = reqwest::Client::new()
        .post(server.url("/auth/refresh"))
        .json(&json!({ "refresh_token": token }))
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() -> Result<()> {
    let mut server = common::spawn_server().await?;
    server.config.security.jwt_secret = "some-other-secret".to_string();
    let forged = server.token(Role::Admin, TokenKind::Access, 3600);

    let res = reqwest::Client::new()
        .get(server.url("/api/users"))
        .bearer_auth(forged)
        .send()
        .await?;
    assert_unauthorized(res).await
}

#[tokio::test]
async fn malformed_login_body_is_a_client_error() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/auth/login"))
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await?;
    assert!(res.status().is_client_error(), "unexpected status: {}", res.status());

    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "email": "missing-fields@uni.edu" }))
        .send()
        .await?;
    assert!(res.status().is_client_error(), "unexpected status: {}", res.status());
    Ok(())
}
