use crate::auth::models::CurrentUser;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Confirm the client finished uploading: stamps `loaded_at` on the record.
///
/// Idempotent from the client's point of view; a repeat call just moves the
/// timestamp forward.
#[tracing::instrument(
    skip(state),
    fields(user_id = %current_user.user_id, media_id = %media_id, operation = "loading_end")
)]
pub async fn loading_end(
    current_user: CurrentUser,
    Path(media_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.lifecycle.mark_as_loaded(media_id).await?;
    Ok(Json(json!({ "success": true })))
}
