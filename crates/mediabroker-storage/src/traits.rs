//! Object storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use mediabroker_core::AppError;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Presigning failed: {0}")]
    PresignFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("object {} not found", key)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Which network-reachable address is embedded in a presigned URL: the
/// internally-routable endpoint or the one external clients can resolve.
/// Both point at the same bucket and credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlAudience {
    Internal,
    External,
}

/// A downloaded object: byte stream plus the content metadata the backend
/// reported, mirrored onto the HTTP response by the caller.
pub struct ObjectPayload {
    pub stream: Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

// The boxed stream has no useful representation; show the metadata only.
impl std::fmt::Debug for ObjectPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPayload")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Uniform capability surface over an S3-compatible backend.
///
/// A single implementing type exists today (`S3ObjectStore`); the trait
/// leaves room for others without inheritance.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Produce a time-limited URL authorizing a PUT of the object at `key`.
    ///
    /// Returned URLs never contain `//` after the scheme.
    async fn presigned_upload_url(
        &self,
        key: &str,
        expires_in: Duration,
        audience: UrlAudience,
    ) -> StorageResult<String>;

    /// Symmetric GET-authorizing URL. Available, though the in-scope download
    /// path proxies the object instead.
    async fn presigned_download_url(&self, key: &str, expires_in: Duration)
        -> StorageResult<String>;

    /// Fetch an object as a byte stream. `NotFound` when the key is absent.
    async fn get_object(&self, key: &str) -> StorageResult<ObjectPayload>;

    /// Store an object; a re-put of the same key replaces prior content.
    /// Callers hand fully buffered bytes.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()>;

    /// Remove an object. Not invoked by any in-scope workflow.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Idempotent bucket provisioning, called once at adapter startup.
    /// Errors are reported loudly but are non-fatal: subsequent object
    /// operations simply fail naturally in degraded mode.
    async fn ensure_bucket_exists(&self) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_payload_debug_shows_metadata_only() {
        let payload = ObjectPayload {
            stream: Box::pin(futures::stream::empty()),
            content_type: Some("image/jpeg".to_string()),
            content_length: Some(4),
        };
        let rendered = format!("{:?}", payload);
        assert!(rendered.contains("image/jpeg"));
        assert!(rendered.contains("content_length: Some(4)"));
    }
}
