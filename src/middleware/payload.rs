use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::auth::ClientKey;
use crate::auth::{envelope, PublicKey};
use crate::error::ApiError;
use crate::state::AppState;

/// Claim a sealed credential body carries
pub const ACCOUNT_CLAIM: &str = "account";

/// Claim used when sealing a session token back to the client
pub const TOKEN_CLAIM: &str = "token";

/// Credential body that is either plain JSON or an `application/jose`
/// envelope signed by the caller's `Client-Public-Key`.
pub struct Payload<T> {
    pub value: T,
    /// Set when the body arrived sealed; replies go back sealed to this key
    pub client_key: Option<PublicKey>,
}

impl<T> Payload<T> {
    pub fn is_sealed(&self) -> bool {
        self.client_key.is_some()
    }

    /// `{"token"}` body, sealed to the client when the request was
    pub fn token_reply(&self, state: &AppState, token: &str) -> Result<Value, ApiError> {
        match &self.client_key {
            Some(client_key) => {
                let sealed = envelope::seal(TOKEN_CLAIM, token, &state.keys, client_key)?;
                Ok(json!({ "token": sealed, "sealed": true }))
            }
            None => Ok(json!({ "token": token })),
        }
    }
}

fn is_sealed(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().starts_with(envelope::MEDIA_TYPE))
        .unwrap_or(false)
}

#[async_trait]
impl<T> FromRequest<AppState> for Payload<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if is_sealed(&req) {
            let client_key = req
                .extensions()
                .get::<ClientKey>()
                .and_then(|k| k.0.clone())
                .ok_or_else(|| ApiError::unauthorized("Sealed bodies require a Client-Public-Key header"))?;

            let body = String::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            let value = envelope::open(body.trim(), ACCOUNT_CLAIM, &state.keys, &client_key)?;

            return Ok(Payload {
                value,
                client_key: Some(client_key),
            });
        }

        if state.config.security.require_envelope {
            return Err(ApiError::unauthorized(format!(
                "Credentials must be sent as {}",
                envelope::MEDIA_TYPE
            )));
        }

        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Payload {
            value,
            client_key: None,
        })
    }
}
