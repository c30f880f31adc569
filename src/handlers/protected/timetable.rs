// handlers/protected/timetable.rs - /timetable handlers
//
// Students own an ordered list of entry ids plus a visibility flag; teachers
// own the entries themselves.

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Account, DbId, NewTimetableEntry, PermissionInfo, TimetableEntry, TimetableView};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount, Json};
use crate::state::AppState;
use crate::validation::{validate_timetable_entries, validate_timetable_entry, FieldError};

#[derive(Debug, Deserialize)]
pub struct EntriesBody {
    pub entries: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct Visibility {
    pub is_public: bool,
}

async fn view_of(state: &AppState, account: &Account) -> Result<TimetableView, ApiError> {
    match &account.permission {
        PermissionInfo::Student(student) => Ok(TimetableView {
            owner: account.user_id,
            is_public: student.timetable.is_public,
            entries: state.db.timetables().find_many(&student.timetable.entries).await?,
        }),
        PermissionInfo::Teacher(_) => Ok(TimetableView {
            owner: account.user_id,
            is_public: true,
            entries: state.db.timetables().list_by_teacher(account.user_id).await?,
        }),
        _ => Err(ApiError::forbidden("Only students and teachers have a timetable")),
    }
}

/// The entry, if the caller is the teacher who owns it
async fn owned_entry(state: &AppState, account: &CurrentAccount, id: DbId) -> Result<TimetableEntry, ApiError> {
    account.teacher()?;
    let entry = state.db.timetables().find(id).await?;
    if entry.teacher_id != account.user_id() {
        return Err(ApiError::forbidden("Timetable entry belongs to another teacher"));
    }
    Ok(entry)
}

/// GET /timetable - student: resolved entries in order; teacher: entries taught
pub async fn timetable_get(State(state): State<AppState>, account: CurrentAccount) -> ApiResult<TimetableView> {
    Ok(ApiResponse::success(view_of(&state, &account.0).await?))
}

/// PUT /timetable - replace the student's entry list; visibility is kept
pub async fn timetable_put(
    State(state): State<AppState>,
    account: CurrentAccount,
    Json(body): Json<EntriesBody>,
) -> ApiResult<TimetableView> {
    account.student()?;
    validate_timetable_entries(&body.entries)?;
    if !state.db.timetables().all_exist(&body.entries).await? {
        return Err(FieldError::new("entries", "every entry must exist").into());
    }

    state
        .db
        .accounts()
        .set_timetable_entries(account.user_id(), &body.entries)
        .await?;
    let refreshed = state.db.accounts().find_by_user_id(account.user_id()).await?;
    Ok(ApiResponse::success(view_of(&state, &refreshed).await?))
}

/// POST /timetable - teacher creates an entry
pub async fn timetable_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    Json(entry): Json<NewTimetableEntry>,
) -> ApiResult<TimetableEntry> {
    account.teacher()?;
    validate_timetable_entry(&entry)?;
    let created = state.db.timetables().insert(account.user_id(), &entry).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /timetable/:id - owning teacher edits an entry
pub async fn timetable_entry_put(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
    Json(entry): Json<NewTimetableEntry>,
) -> ApiResult<TimetableEntry> {
    owned_entry(&state, &account, id).await?;
    validate_timetable_entry(&entry)?;
    Ok(ApiResponse::success(state.db.timetables().update(id, &entry).await?))
}

/// DELETE /timetable/:id - also removes the id from every student's list
pub async fn timetable_entry_delete(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
) -> ApiResult<()> {
    owned_entry(&state, &account, id).await?;
    state.db.timetables().delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}

async fn set_visibility(state: &AppState, account: &CurrentAccount, is_public: bool) -> ApiResult<Visibility> {
    account.student()?;
    state
        .db
        .accounts()
        .set_timetable_visibility(account.user_id(), is_public)
        .await?;
    Ok(ApiResponse::success(Visibility { is_public }))
}

/// GET /timetable/lock - make the timetable private (idempotent)
pub async fn timetable_lock(State(state): State<AppState>, account: CurrentAccount) -> ApiResult<Visibility> {
    set_visibility(&state, &account, false).await
}

/// GET /timetable/unlock - make the timetable public (idempotent)
pub async fn timetable_unlock(State(state): State<AppState>, account: CurrentAccount) -> ApiResult<Visibility> {
    set_visibility(&state, &account, true).await
}

/// GET /timetable/student/:user_id - another student's timetable, if public
pub async fn student_timetable_get(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(user_id): Path<Uuid>,
) -> ApiResult<TimetableView> {
    let owner = state.db.accounts().find_by_user_id(user_id).await?;
    let student = owner
        .permission
        .as_student()
        .ok_or_else(|| ApiError::not_found(format!("No student with id {}", user_id)))?;

    if !student.timetable.is_public && owner.user_id != account.user_id() {
        return Err(ApiError::forbidden("This timetable is private"));
    }
    Ok(ApiResponse::success(view_of(&state, &owner).await?))
}
