// handlers/public/auth/login.rs - POST /auth/login handler

use axum::extract::State;
use serde_json::Value;

use crate::middleware::{ApiResponse, ApiResult, Payload};
use crate::services::{AccountService, LoginRequest};
use crate::state::AppState;

/**
 * POST /auth/login - Authenticate and receive a session token
 *
 * Expected Input (plain JSON, or sealed as `application/jose` with claim `account`):
 * ```json
 * { "email": "kim@school.example", "password": "..." }
 * ```
 *
 * Expected Output:
 * ```json
 * { "success": true, "data": { "token": "eyJhbGciOiJSUzI1NiI..." } }
 * ```
 *
 * A sealed request gets a sealed token back (`"sealed": true`). Unknown
 * email and wrong password both answer 401 with the same message.
 */
pub async fn login_post(State(state): State<AppState>, payload: Payload<LoginRequest>) -> ApiResult<Value> {
    let token = AccountService::new(&state).login(payload.value.clone()).await?;
    Ok(ApiResponse::success(payload.token_reply(&state, &token)?))
}
