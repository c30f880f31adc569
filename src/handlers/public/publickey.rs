// handlers/public/publickey.rs - GET /publickey handler

use axum::extract::State;
use serde::Serialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PublicKeyResponse {
    /// base64 of the SPKI PEM, the same encoding clients send in `Client-Public-Key`
    pub public_key: String,
    pub key_algorithm: &'static str,
    pub content_encryption: &'static str,
}

/**
 * GET /publickey - The server's RSA public key
 *
 * Clients seal login and registration bodies to this key and verify sealed
 * replies against it.
 */
pub async fn publickey_get(State(state): State<AppState>) -> ApiResult<PublicKeyResponse> {
    Ok(ApiResponse::success(PublicKeyResponse {
        public_key: state.keys.public_key().to_header_value(),
        key_algorithm: "RSA-OAEP-256",
        content_encryption: "A128GCM",
    }))
}
