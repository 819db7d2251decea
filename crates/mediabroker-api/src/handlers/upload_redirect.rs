use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use mediabroker_core::AppError;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Server-proxied upload fallback for clients that cannot PUT to a presigned
/// URL (e.g. the object store is not reachable from their network).
///
/// Accepts a multipart form with a single `file` field, writes the bytes to
/// the object store under the record's logical key, and marks the record as
/// loaded in the same request.
#[tracing::instrument(skip(state, multipart), fields(media_id = %media_id, operation = "upload_redirect"))]
pub async fn upload_redirect(
    Path(media_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state.lifecycle.get_media_by_id(media_id).await?;

    let mut file_part = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(String::from);
            // The whole part is buffered; the router's body limit caps it.
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file field: {}", e)))?;
            file_part = Some((data, content_type));
            break;
        }
    }

    let (data, content_type) = file_part
        .ok_or_else(|| AppError::InvalidInput("Missing 'file' field in multipart body".to_string()))?;

    let size = data.len();
    state
        .lifecycle
        .upload_file(&record.logical_key, data, content_type.as_deref())
        .await?;
    state.lifecycle.mark_as_loaded(media_id).await?;

    tracing::info!(
        media_id = %media_id,
        logical_key = %record.logical_key,
        size = size,
        "Proxied upload stored"
    );

    Ok(Json(json!({
        "success": true,
        "message": "File uploaded successfully",
        "size": size,
        "mimetype": content_type,
    })))
}
