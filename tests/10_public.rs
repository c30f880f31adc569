mod common;

use anyhow::Result;
use common::{spawn_app, Options};
use school_api::auth::PublicKey;

#[tokio::test]
async fn test_publickey_serves_server_key() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let resp = server.client.get(server.url("/publickey")).send().await?;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["key_algorithm"], "RSA-OAEP-256");
    assert_eq!(body["data"]["content_encryption"], "A128GCM");

    let advertised = body["data"]["public_key"].as_str().expect("public_key");
    let parsed = PublicKey::from_header_value(advertised)?;
    assert_eq!(&parsed, server.state.keys.public_key());
    Ok(())
}

#[tokio::test]
async fn test_health_reports_unreachable_database() -> Result<()> {
    let server = spawn_app(Options::default()).await?;

    let resp = server.client.get(server.url("/health")).send().await?;
    assert_eq!(resp.status(), 503);
    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(body["data"]["status"], "degraded");
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let server = spawn_app(Options::default()).await?;
    let resp = server.client.get(server.url("/nope")).send().await?;
    assert_eq!(resp.status(), 404);
    Ok(())
}
