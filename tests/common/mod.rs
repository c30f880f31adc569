#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

use school_api::auth::oauth::IdentityProvider;
use school_api::auth::{envelope, RsaKeyPair, USER_ID_CLAIM};
use school_api::config::AppConfig;
use school_api::database::models::School;
use school_api::database::DatabaseManager;
use school_api::middleware::CLIENT_KEY_HEADER;
use school_api::state::AppState;

pub const SERVER_PRIVATE_PEM: &str = include_str!("../fixtures/server_private.pem");
pub const CLIENT_PRIVATE_PEM: &str = include_str!("../fixtures/client_private.pem");

/// Unreachable database for tests that must never touch storage
const NO_DATABASE_URL: &str = "postgres://school@127.0.0.1:1/school";

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
    _maps: TempDir,
}

#[derive(Default)]
pub struct Options {
    pub database: bool,
    pub env: Vec<(&'static str, String)>,
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
}

/// PostgreSQL for scenario tests; those tests are skipped when unset
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok().filter(|url| !url.is_empty())
}

pub fn client_keys() -> RsaKeyPair {
    RsaKeyPair::from_pem(CLIENT_PRIVATE_PEM).expect("client fixture key")
}

/// Start the app in-process on a free port
pub async fn spawn_app(options: Options) -> Result<TestServer> {
    let maps = tempfile::tempdir()?;
    let db_url = if options.database {
        database_url().context("TEST_DATABASE_URL is not set")?
    } else {
        NO_DATABASE_URL.to_string()
    };

    let mut env: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", db_url),
        ("DATABASE_ACQUIRE_TIMEOUT_SECS", "1".to_string()),
        ("BCRYPT_COST", "4".to_string()),
        ("MAP_DIR", maps.path().display().to_string()),
    ]);
    env.extend(options.env.iter().map(|(k, v)| (*k, v.clone())));

    let config = AppConfig::from_lookup(|key| env.get(key).cloned())?;
    let keys = RsaKeyPair::from_pem(SERVER_PRIVATE_PEM)?;

    let db = if options.database {
        let db = DatabaseManager::connect(&config.database).await?;
        db.bootstrap_schema().await?;
        db
    } else {
        DatabaseManager::connect_lazy(&config.database)?
    };

    let mut state = AppState::new(config, db, keys)?;
    if let Some(provider) = options.identity_provider {
        state = state.with_identity_provider(provider);
    }

    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let app = school_api::build_app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        state,
        client: reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?,
        _maps: maps,
    })
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Session token minted directly by the server's issuer
    pub fn token_for(&self, user_id: Uuid) -> String {
        self.state.tokens.issue(USER_ID_CLAIM, &user_id).expect("issue token")
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(u16, Value)> {
        let resp = self.client.get(self.url(path)).bearer_auth(token).send().await?;
        Ok((resp.status().as_u16(), resp.json().await.unwrap_or(Value::Null)))
    }

    pub async fn send_json<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<(u16, Value)> {
        let mut request = self.client.request(method, self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;
        Ok((resp.status().as_u16(), resp.json().await.unwrap_or(Value::Null)))
    }

    /// Seal `body` from the client fixture key to the server and POST it
    pub async fn post_sealed<B: Serialize>(&self, path: &str, body: &B) -> Result<(u16, Value)> {
        let client = client_keys();
        let sealed = envelope::seal("account", body, &client, self.state.keys.public_key())?;
        let resp = self
            .client
            .post(self.url(path))
            .header(CONTENT_TYPE, envelope::MEDIA_TYPE)
            .header(CLIENT_KEY_HEADER, client.public_key().to_header_value())
            .body(sealed)
            .send()
            .await?;
        Ok((resp.status().as_u16(), resp.json().await.unwrap_or(Value::Null)))
    }

    /// Register a school directly through the repository
    pub async fn add_school(&self, domain: Option<&str>) -> Result<School> {
        let school_id = format!("S{}", &Uuid::new_v4().simple().to_string()[..8]);
        let school = School {
            id: 0,
            school_id,
            region_id: "R1".to_string(),
            school_name: "Test High School".to_string(),
            region_name: "Test Region".to_string(),
            organization_email_only: domain.is_some(),
            email_domain: domain.map(str::to_string),
        };
        Ok(self.state.db.schools().insert(&school).await?)
    }

    /// Register through the API and log in; returns (user_id, token)
    pub async fn register_and_login(&self, mut body: Value) -> Result<(Uuid, String)> {
        let email = format!("{}@school.test", Uuid::new_v4().simple());
        body["email"] = json!(email);
        body["password"] = json!("correct horse");
        if body.get("name").is_none() {
            body["name"] = json!("Test User");
        }

        let (status, registered) = self
            .send_json(reqwest::Method::POST, "/auth/register", None, &body)
            .await?;
        anyhow::ensure!(status == 201, "register failed: {} {}", status, registered);
        let user_id: Uuid = serde_json::from_value(registered["data"]["user_id"].clone())?;

        let (status, login) = self
            .send_json(
                reqwest::Method::POST,
                "/auth/login",
                None,
                &json!({ "email": email, "password": "correct horse" }),
            )
            .await?;
        anyhow::ensure!(status == 200, "login failed: {} {}", status, login);
        let token = login["data"]["token"].as_str().context("token")?.to_string();
        Ok((user_id, token))
    }
}
