// handlers/public/auth/register.rs - POST|PUT /auth/register handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, Payload};
use crate::services::{AccountService, RegisterRequest, Registered};
use crate::state::AppState;

/**
 * POST /auth/register - Create an account
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Kim Minji",
 *   "email": "kim@school.example",
 *   "password": "...",
 *   "level": "student",          // student | teacher | admin
 *   "school_id": "S1",           // student, teacher
 *   "grade": 2, "class": 3, "number": 15   // student only
 * }
 * ```
 *
 * Returns 201 with `{ "id", "user_id" }`. Fields that belong to another
 * level are rejected. 409 when the email is taken, 400 when the school is
 * not registered.
 */
pub async fn register_post(
    State(state): State<AppState>,
    payload: Payload<RegisterRequest>,
) -> ApiResult<Registered> {
    let registered = AccountService::new(&state).register(payload.value).await?;
    Ok(ApiResponse::created(registered))
}
