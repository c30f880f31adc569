// handlers/public/auth/oauth.rs - GET /auth/oauth, GET /auth/oauthsuccess

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::oauth::OAuthError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AccountService, OAuthLogin};
use crate::state::AppState;

/// Claim carried by the signed `state` parameter
pub const OAUTH_STATE_CLAIM: &str = "oauth_state";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/oauth - redirect to the identity provider
pub async fn oauth_get(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let provider = state.identity_provider()?;
    let nonce = state.tokens.issue(OAUTH_STATE_CLAIM, &Uuid::new_v4())?;
    Ok(Redirect::to(&provider.authorize_url(&nonce)))
}

/**
 * GET /auth/oauthsuccess?code=..&state=.. - provider callback
 *
 * Known address: `{ "token": <session token> }`.
 * Unknown address: `{ "email": <signed email assertion> }`, to be passed as
 * `email_token` on registration.
 */
pub async fn oauth_success_get(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<OAuthLogin> {
    let provider = state.identity_provider()?;

    if let Some(error) = query.error {
        warn!("OAuth authorization denied: {}", error);
        return Err(ApiError::unauthorized(format!("Authorization was denied: {}", error)));
    }

    let nonce = query.state.ok_or(OAuthError::InvalidState)?;
    state
        .tokens
        .verify::<Uuid>(&nonce, OAUTH_STATE_CLAIM)
        .map_err(|_| OAuthError::InvalidState)?;

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;

    let email = provider.fetch_email(&code).await?;
    let login = AccountService::new(&state).resolve_oauth_email(&email).await?;
    Ok(ApiResponse::success(login))
}
