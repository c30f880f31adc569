use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{PublicKey, USER_ID_CLAIM};
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's RSA public key as base64 PEM
pub const CLIENT_KEY_HEADER: &str = "client-public-key";

/// The caller's public key, when it sent one
#[derive(Clone, Debug)]
pub struct ClientKey(pub Option<PublicKey>);

/// Authenticated account id extracted from the session token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Parses `Client-Public-Key`. A malformed key is always rejected; a missing
/// one only when sealed transport is mandatory.
pub async fn client_key_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client_key = match request.headers().get(CLIENT_KEY_HEADER) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| ApiError::unauthorized("Client-Public-Key header is not valid text"))?;
            let key = PublicKey::from_header_value(value).map_err(|e| {
                warn!("Rejected client public key: {}", e);
                ApiError::unauthorized("Client-Public-Key header is not a valid RSA public key")
            })?;
            Some(key)
        }
        None if state.config.security.require_envelope => {
            return Err(ApiError::unauthorized("Client-Public-Key header is required"));
        }
        None => None,
    };

    request.extensions_mut().insert(ClientKey(client_key));
    Ok(next.run(request).await)
}

/// JWT authentication middleware that validates tokens and binds the account id
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Extract JWT from Authorization header
    let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;

    let user_id: Uuid = state.tokens.verify(&token, USER_ID_CLAIM).map_err(|e| {
        debug!("Rejected session token: {}", e);
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
