// handlers/protected/cafeteria_menus.rs - /cafeteria_menus handlers

use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::database::models::{CafeteriaMenu, DbId};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount, Json};
use crate::state::AppState;
use crate::validation::validate_menu;

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,
    /// Defaults to the caller's school
    pub school_id: Option<String>,
}

async fn ensure_school(state: &AppState, school_id: &str) -> Result<(), ApiError> {
    if state.db.schools().find(school_id).await?.is_none() {
        return Err(ApiError::bad_request(format!("School {} is not registered", school_id)));
    }
    Ok(())
}

/// GET /cafeteria_menus?date=2024-03-04&school_id=S1 - every meal that day
pub async fn menus_get(
    State(state): State<AppState>,
    account: CurrentAccount,
    Query(query): Query<MenuQuery>,
) -> ApiResult<Vec<CafeteriaMenu>> {
    let school_id = query
        .school_id
        .or_else(|| account.0.permission.school_id().map(str::to_string))
        .ok_or_else(|| ApiError::bad_request("school_id is required"))?;
    let date = query.date.unwrap_or_else(|| chrono::Utc::now().date_naive());

    Ok(ApiResponse::success(
        state.db.menus().list_for_date(&school_id, date).await?,
    ))
}

/// POST /cafeteria_menus - teachers for their school, admins for any
pub async fn menus_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    Json(menu): Json<CafeteriaMenu>,
) -> ApiResult<CafeteriaMenu> {
    account.require_school_staff(&menu.school_id)?;
    validate_menu(&menu)?;
    ensure_school(&state, &menu.school_id).await?;

    let created = state.db.menus().insert(&menu).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /cafeteria_menus/:id - replace a menu and its items
pub async fn menu_put(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
    Json(menu): Json<CafeteriaMenu>,
) -> ApiResult<CafeteriaMenu> {
    let existing = state.db.menus().find(id).await?;
    account.require_school_staff(&existing.school_id)?;
    account.require_school_staff(&menu.school_id)?;
    validate_menu(&menu)?;
    if menu.school_id != existing.school_id {
        ensure_school(&state, &menu.school_id).await?;
    }

    Ok(ApiResponse::success(state.db.menus().replace(id, &menu).await?))
}

/// DELETE /cafeteria_menus/:id
pub async fn menu_delete(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
) -> ApiResult<()> {
    let existing = state.db.menus().find(id).await?;
    account.require_school_staff(&existing.school_id)?;
    state.db.menus().delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}
