// handlers/protected/checklist.rs - /checklist handlers (students)

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::database::models::{Checklist, ChecklistInput, ChecklistItem, DbId};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount, Json};
use crate::state::AppState;
use crate::validation::validate_checklist;

/// The checklist, if it belongs to the calling student
async fn owned_checklist(state: &AppState, account: &CurrentAccount, id: DbId) -> Result<Checklist, ApiError> {
    account.student()?;
    let checklist = state.db.checklists().find(id).await?;
    if checklist.student_id != account.user_id() {
        return Err(ApiError::forbidden("Checklist belongs to another student"));
    }
    Ok(checklist)
}

/// GET /checklist - the caller's checklist
pub async fn checklist_get(State(state): State<AppState>, account: CurrentAccount) -> ApiResult<Checklist> {
    account.student()?;
    Ok(ApiResponse::success(
        state.db.checklists().find_by_student(account.user_id()).await?,
    ))
}

/**
 * POST /checklist - create the caller's only checklist
 *
 * Items start incomplete regardless of the submitted `complete` flags.
 * `shared_with` may only name the student's friends. 409 when a checklist
 * already exists.
 */
pub async fn checklist_post(
    State(state): State<AppState>,
    account: CurrentAccount,
    Json(input): Json<ChecklistInput>,
) -> ApiResult<Checklist> {
    let student = account.student()?;
    validate_checklist(&input, &student.friends)?;

    let title = input.title_or_default();
    let items: Vec<ChecklistItem> = input
        .items
        .into_iter()
        .map(|item| ChecklistItem { complete: false, ..item })
        .collect();

    let created = state
        .db
        .checklists()
        .create_for_student(account.user_id(), &title, &items)
        .await?;
    Ok(ApiResponse::created(created))
}

/// PUT /checklist/:id - replace title and items
pub async fn checklist_put(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
    Json(input): Json<ChecklistInput>,
) -> ApiResult<Checklist> {
    owned_checklist(&state, &account, id).await?;
    validate_checklist(&input, &account.student()?.friends)?;

    let title = input.title_or_default();
    let updated = state.db.checklists().replace(id, &title, &input.items).await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /checklist/:id
pub async fn checklist_delete(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(id): Path<DbId>,
) -> ApiResult<()> {
    owned_checklist(&state, &account, id).await?;
    state.db.checklists().delete(id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// GET /checklist/lock - every item private
pub async fn checklist_lock(State(state): State<AppState>, account: CurrentAccount) -> ApiResult<Checklist> {
    account.student()?;
    Ok(ApiResponse::success(
        state.db.checklists().set_visibility(account.user_id(), false).await?,
    ))
}

/// GET /checklist/unlock - every item public
pub async fn checklist_unlock(State(state): State<AppState>, account: CurrentAccount) -> ApiResult<Checklist> {
    account.student()?;
    Ok(ApiResponse::success(
        state.db.checklists().set_visibility(account.user_id(), true).await?,
    ))
}

/// Items of `checklist` that `viewer` may see
pub fn visible_part(checklist: Checklist, viewer: Uuid) -> Checklist {
    if checklist.student_id == viewer {
        return checklist;
    }
    let items = checklist
        .items
        .into_iter()
        .filter(|item| item.visible_to(viewer))
        .collect();
    Checklist { items, ..checklist }
}

/// GET /checklist/student/:user_id - public items and items shared with the caller
pub async fn student_checklist_get(
    State(state): State<AppState>,
    account: CurrentAccount,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Checklist> {
    let checklist = state.db.checklists().find_by_student(user_id).await?;
    Ok(ApiResponse::success(visible_part(checklist, account.user_id())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str, is_public: bool, shared_with: Vec<Uuid>) -> ChecklistItem {
        ChecklistItem {
            text: text.to_string(),
            complete: false,
            is_public,
            shared_with,
        }
    }

    #[test]
    fn viewers_see_public_and_shared_items_only() {
        let owner = Uuid::new_v4();
        let friend = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let checklist = Checklist {
            id: 1,
            student_id: owner,
            title: "checklist".to_string(),
            items: vec![
                item("public", true, vec![]),
                item("shared", false, vec![friend]),
                item("private", false, vec![]),
            ],
        };

        let texts = |c: Checklist| c.items.into_iter().map(|i| i.text).collect::<Vec<_>>();
        assert_eq!(texts(visible_part(checklist.clone(), owner)), ["public", "shared", "private"]);
        assert_eq!(texts(visible_part(checklist.clone(), friend)), ["public", "shared"]);
        assert_eq!(texts(visible_part(checklist, stranger)), ["public"]);
    }
}
