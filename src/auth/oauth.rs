use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
pub const EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("OAuth login is not configured")]
    Disabled,

    #[error("Invalid OAuth state")]
    InvalidState,

    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Provider did not return an email address")]
    MissingEmail,
}

/// External identity provider reached through the authorization-code flow
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser; `state` comes back on the callback
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange `code` for an access token and read the account's email
    async fn fetch_email(&self, code: &str) -> Result<String, OAuthError>;
}

#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

pub struct GoogleProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    endpoints: GoogleEndpoints,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
}

impl GoogleProvider {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OAuthError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            endpoints: GoogleEndpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<TokenResponse>().await?.access_token)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OAuthError::Provider {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> String {
        match Url::parse_with_params(
            &self.endpoints.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", EMAIL_SCOPE),
                ("access_type", "online"),
                ("state", state),
            ],
        ) {
            Ok(url) => url.into(),
            Err(e) => {
                tracing::error!("Invalid OAuth authorization endpoint {}: {}", self.endpoints.auth_url, e);
                self.endpoints.auth_url.clone()
            }
        }
    }

    async fn fetch_email(&self, code: &str) -> Result<String, OAuthError> {
        let access_token = self.exchange_code(code).await?;

        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let info: UserInfo = check_status(response).await?.json().await?;

        match info.email {
            Some(email) if !email.trim().is_empty() => Ok(email),
            _ => Err(OAuthError::MissingEmail),
        }
    }
}
