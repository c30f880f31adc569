mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{spawn_app, Options};
use school_api::auth::oauth::{IdentityProvider, OAuthError};
use school_api::auth::{TokenIssuer, USER_ID_CLAIM};
use school_api::middleware::CLIENT_KEY_HEADER;

/// Identity provider that answers from the authorization code alone
struct StubProvider;

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://idp.test/authorize?state={}", state)
    }

    async fn fetch_email(&self, code: &str) -> Result<String, OAuthError> {
        match code {
            "no-email" => Err(OAuthError::MissingEmail),
            other => Ok(format!("{}@school.test", other)),
        }
    }
}

fn with_stub_provider() -> Options {
    Options {
        identity_provider: Some(Arc::new(StubProvider)),
        ..Options::default()
    }
}

#[tokio::test]
async fn test_protected_routes_require_bearer_token() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    for path in ["/students", "/timetable", "/checklist", "/cafeteria_menus", "/map"] {
        let resp = server.client.get(server.url(path)).send().await?;
        assert_eq!(resp.status(), 401, "{} without token", path);
        let body: serde_json::Value = resp.json().await?;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn test_rejects_garbage_and_expired_tokens() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let (status, _) = server.get("/students", "not.a.jwt").await?;
    assert_eq!(status, 401);

    let expired = server
        .state
        .tokens
        .issue_at(USER_ID_CLAIM, &Uuid::new_v4(), Utc::now() - Duration::hours(25))?;
    let (status, _) = server.get("/students", &expired).await?;
    assert_eq!(status, 401);

    // Email assertions are not session tokens
    let wrong_claim = server.state.tokens.issue("email", &"someone@school.test")?;
    let (status, _) = server.get("/students", &wrong_claim).await?;
    assert_eq!(status, 401);
    Ok(())
}

#[tokio::test]
async fn test_rejects_token_signed_with_other_algorithm() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let hmac = TokenIssuer::hmac("some-shared-secret", Duration::hours(24))?;
    let token = hmac.issue(USER_ID_CLAIM, &Uuid::new_v4())?;
    let (status, _) = server.get("/students", &token).await?;
    assert_eq!(status, 401);
    Ok(())
}

#[tokio::test]
async fn test_hmac_deployment_rejects_rsa_tokens() -> Result<()> {
    let server = spawn_app(Options {
        env: vec![
            ("TOKEN_ALGORITHM", "HS256".to_string()),
            ("SECRET_KEY", "test-secret".to_string()),
        ],
        ..Options::default()
    })
    .await?;

    let keys = school_api::auth::RsaKeyPair::from_pem(common::SERVER_PRIVATE_PEM)?;
    let rsa = TokenIssuer::rsa(&keys, Duration::hours(24));
    let token = rsa.issue(USER_ID_CLAIM, &Uuid::new_v4())?;
    let (status, _) = server.get("/timetable", &token).await?;
    assert_eq!(status, 401);
    Ok(())
}

#[tokio::test]
async fn test_malformed_client_key_is_rejected() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let resp = server
        .client
        .post(server.url("/auth/login"))
        .header(CLIENT_KEY_HEADER, "definitely not a key")
        .json(&json!({ "email": "a@school.test", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(resp.status(), 401);
    Ok(())
}

#[tokio::test]
async fn test_envelope_required_rejects_plain_login() -> Result<()> {
    let server = spawn_app(Options {
        env: vec![("SECURITY_REQUIRE_ENVELOPE", "true".to_string())],
        ..Options::default()
    })
    .await?;

    // No client key at all
    let (status, _) = server
        .send_json(
            reqwest::Method::POST,
            "/auth/login",
            None,
            &json!({ "email": "a@school.test", "password": "pw" }),
        )
        .await?;
    assert_eq!(status, 401);

    // Client key present but body is plain JSON
    let client = common::client_keys();
    let resp = server
        .client
        .post(server.url("/auth/login"))
        .header(CLIENT_KEY_HEADER, client.public_key().to_header_value())
        .json(&json!({ "email": "a@school.test", "password": "pw" }))
        .send()
        .await?;
    assert_eq!(resp.status(), 401);

    // Public routes stay open
    let resp = server.client.get(server.url("/publickey")).send().await?;
    assert_eq!(resp.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_invalid_json_body_is_400() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let resp = server
        .client
        .post(server.url("/auth/login"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"email\": ")
        .send()
        .await?;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn test_oauth_disabled_without_credentials() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let resp = server.client.get(server.url("/auth/oauth")).send().await?;
    assert_eq!(resp.status(), 503);
    let resp = server
        .client
        .get(server.url("/auth/oauthsuccess?code=abc&state=xyz"))
        .send()
        .await?;
    assert_eq!(resp.status(), 503);
    Ok(())
}

#[tokio::test]
async fn test_oauth_redirect_carries_signed_state() -> Result<()> {
    let server = spawn_app(with_stub_provider()).await?;

    let resp = server.client.get(server.url("/auth/oauth")).send().await?;
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string();
    assert!(location.starts_with("https://idp.test/authorize?state="));

    let state = location.split("state=").nth(1).expect("state param");
    let nonce: Uuid = server.state.tokens.verify(state, "oauth_state")?;
    assert!(!nonce.is_nil());
    Ok(())
}

#[tokio::test]
async fn test_oauth_callback_failures() -> Result<()> {
    let server = spawn_app(with_stub_provider()).await?;
    let state = server.state.tokens.issue("oauth_state", &Uuid::new_v4())?;

    // Forged state
    let resp = server
        .client
        .get(server.url("/auth/oauthsuccess?code=abc&state=forged"))
        .send()
        .await?;
    assert_eq!(resp.status(), 400);

    // Missing state
    let resp = server.client.get(server.url("/auth/oauthsuccess?code=abc")).send().await?;
    assert_eq!(resp.status(), 400);

    // Provider reported an error
    let resp = server
        .client
        .get(server.url(&format!("/auth/oauthsuccess?error=access_denied&state={}", state)))
        .send()
        .await?;
    assert_eq!(resp.status(), 401);

    // Missing code
    let resp = server
        .client
        .get(server.url(&format!("/auth/oauthsuccess?state={}", state)))
        .send()
        .await?;
    assert_eq!(resp.status(), 400);

    // Provider returned no email
    let resp = server
        .client
        .get(server.url(&format!("/auth/oauthsuccess?code=no-email&state={}", state)))
        .send()
        .await?;
    assert_eq!(resp.status(), 502);
    Ok(())
}
