// handlers/protected/admin.rs - /admins/accounts handlers (admin only)

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::info;

use crate::database::models::{Account, DbId, PermissionLevel};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Restrict to one level (`student`, `teacher`, `admin`)
    pub level: Option<String>,
}

/// GET /admins/accounts[?level=student]
pub async fn accounts_list(
    State(state): State<AppState>,
    account: CurrentAccount,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Account>> {
    account.require_level(PermissionLevel::Admin)?;

    let level = match query.level.as_deref() {
        Some(name) => Some(name.parse::<PermissionLevel>().map_err(ApiError::bad_request)?),
        None => None,
    };
    Ok(ApiResponse::success(state.db.accounts().list(level).await?))
}

/**
 * DELETE /admins/accounts/:id - remove an account by database id
 *
 * Also strips the account from friend lists and checklist share lists, and
 * drops timetable entries it taught from students' timetables.
 */
pub async fn account_delete(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
) -> ApiResult<Account> {
    account.require_level(PermissionLevel::Admin)?;
    if account.0.id == id {
        return Err(ApiError::bad_request("Admins cannot delete their own account"));
    }

    let deleted = state.db.accounts().delete(id).await?;
    info!("Admin {} deleted account {}", account.user_id(), deleted.user_id);
    Ok(ApiResponse::success(deleted))
}
