// handlers/protected/accounts.rs - /students, /teachers, /admins handlers
//
// The three prefixes share one set of handlers parameterised by level.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Router,
};
use uuid::Uuid;

use crate::database::models::{Account, PermissionLevel};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount, Payload};
use crate::services::{AccountService, ProfileUpdate};
use crate::state::AppState;

/// GET /<level> - the caller's own account; 403 for another level
pub async fn own_account(account: CurrentAccount, level: PermissionLevel) -> ApiResult<Account> {
    account.require_level(level)?;
    Ok(ApiResponse::success(account.0))
}

/// GET /<level>/:user_id - any account of that level, as the caller may see it
pub async fn account_by_id(
    state: &AppState,
    viewer: &CurrentAccount,
    user_id: Uuid,
    level: PermissionLevel,
) -> ApiResult<Account> {
    let account = state.db.accounts().find_by_user_id(user_id).await?;
    if account.level() != level {
        return Err(ApiError::not_found(format!("No {} with id {}", level, user_id)));
    }
    Ok(ApiResponse::success(account.seen_by(viewer.user_id())))
}

/// PUT /<level>/config - merge fields into the caller's profile
pub async fn update_config(
    state: &AppState,
    account: CurrentAccount,
    level: PermissionLevel,
    update: ProfileUpdate,
) -> ApiResult<Account> {
    account.require_level(level)?;
    let updated = AccountService::new(state).update_profile(account.user_id(), update).await?;
    Ok(ApiResponse::success(updated))
}

/// Routes mounted under `/students`, `/teachers` or `/admins`
pub fn level_routes(level: PermissionLevel) -> Router<AppState> {
    Router::new()
        .route("/", get(move |account: CurrentAccount| own_account(account, level)))
        .route(
            "/config",
            put(
                move |State(state): State<AppState>, account: CurrentAccount, payload: Payload<ProfileUpdate>| async move {
                    update_config(&state, account, level, payload.value).await
                },
            ),
        )
        .route(
            "/:user_id",
            get(
                move |State(state): State<AppState>, viewer: CurrentAccount, Path(user_id): Path<Uuid>| async move {
                    account_by_id(&state, &viewer, user_id, level).await
                },
            ),
        )
}
