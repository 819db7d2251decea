use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use mediabroker_core::AppError;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Logical key of the media, e.g. `/u1/9f3b….jpg`.
    pub url: String,
}

/// Stream media bytes back through the server.
///
/// Resolves the record (cache-aside) before touching the object store, then
/// proxies the object's byte stream with its Content-Type and Content-Length
/// mirrored onto the response.
#[tracing::instrument(skip(state), fields(logical_key = %query.url, operation = "download"))]
pub async fn download(
    Query(query): Query<DownloadQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let payload = state.lifecycle.download_file(&query.url).await?;

    let body_stream = payload.stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(content_type) = payload.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    if let Some(content_length) = payload.content_length {
        builder = builder.header(header::CONTENT_LENGTH, content_length);
    }

    let response = builder.body(Body::from_stream(body_stream)).map_err(|e| {
        tracing::error!(error = %e, "Failed to build download response");
        AppError::Internal(e.to_string())
    })?;

    Ok(response)
}
