// handlers/protected/map.rs - GET|PUT /map handlers

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentAccount};
use crate::services::{MapError, MapStore};
use crate::state::AppState;

/// Multipart field holding the upload
pub const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct MapUploaded {
    pub school_id: String,
    pub size: usize,
}

fn caller_school(account: &CurrentAccount) -> Result<String, ApiError> {
    account
        .0
        .permission
        .school_id()
        .map(str::to_string)
        .ok_or_else(|| ApiError::forbidden("Only student and teacher accounts belong to a school"))
}

/// GET /map - the caller's school map, served with its image content type
pub async fn map_get(State(state): State<AppState>, account: CurrentAccount) -> Result<impl IntoResponse, ApiError> {
    let school_id = caller_school(&account)?;
    let map = state.maps.load(&school_id).await?;
    Ok(([(header::CONTENT_TYPE, map.content_type)], map.bytes))
}

/// PUT /map - multipart upload (`image` field, png/jpg/jpeg), teachers only
pub async fn map_put(
    State(state): State<AppState>,
    account: CurrentAccount,
    mut multipart: Multipart,
) -> ApiResult<MapUploaded> {
    let school_id = account.teacher()?.school_id.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        MapStore::extension_of(&filename)?;
        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::from(MapError::TooLarge {
                    limit: state.maps.max_bytes(),
                })
            } else {
                ApiError::bad_request(e.body_text())
            }
        })?;

        state.maps.store(&school_id, &filename, &bytes).await?;
        return Ok(ApiResponse::success(MapUploaded {
            school_id,
            size: bytes.len(),
        }));
    }

    Err(ApiError::bad_request(format!("Missing multipart field '{}'", IMAGE_FIELD)))
}
