use crate::auth::models::CurrentUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use mediabroker_core::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMediaRequest {
    #[validate(length(min = 1, message = "filename must not be empty"))]
    pub filename: String,
    #[validate(range(min = 1, message = "size must be positive"))]
    pub size: i64,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMediaResponse {
    pub media_id: Uuid,
    /// Logical key under which the media can later be downloaded.
    pub url: String,
    /// Presigned URL the client PUTs the file bytes to.
    pub upload_url: String,
}

/// Create a media record and return a presigned upload URL.
#[tracing::instrument(
    skip(state, request),
    fields(user_id = %current_user.user_id, filename = %request.filename, operation = "create_media")
)]
pub async fn create_media(
    current_user: CurrentUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateMediaRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let created = state
        .lifecycle
        .create_media(
            &current_user.user_id,
            &request.filename,
            request.size,
            request.metadata,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateMediaResponse {
            media_id: created.media_id,
            url: created.logical_key,
            upload_url: created.upload_url,
        }),
    ))
}
