// handlers/protected/events.rs - /events handlers

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::database::models::Events;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount, Json};
use crate::state::AppState;
use crate::validation::{validate_events, validate_month};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Defaults to the caller's school
    pub school_id: Option<String>,
}

/// GET /events/:month - the school calendar for one month (1..=12)
pub async fn events_get(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(month): Path<i16>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Events> {
    validate_month(month)?;
    let school_id = query
        .school_id
        .or_else(|| account.0.permission.school_id().map(str::to_string))
        .ok_or_else(|| ApiError::bad_request("school_id is required"))?;

    Ok(ApiResponse::success(
        state.db.events().find_month(&school_id, month).await?,
    ))
}

/**
 * POST /events - insert or replace a school's calendar for one month
 *
 * Every entry's date must fall inside `month`; attendance codes are -1, 0
 * or 1 per grade.
 */
pub async fn events_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    Json(events): Json<Events>,
) -> ApiResult<Events> {
    account.require_school_staff(&events.school_id)?;
    validate_events(&events)?;
    if state.db.schools().find(&events.school_id).await?.is_none() {
        return Err(ApiError::bad_request(format!(
            "School {} is not registered",
            events.school_id
        )));
    }

    Ok(ApiResponse::success(state.db.events().upsert(&events).await?))
}
