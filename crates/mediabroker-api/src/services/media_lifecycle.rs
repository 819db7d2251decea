//! Media lifecycle coordinator.
//!
//! Ties the metadata store, the cache-aside layer, and the object store
//! adapter together: generates logical keys, creates records, issues
//! presigned upload URLs, marks upload completion, and serves downloads.
//!
//! Caching discipline: reads check the cache first and populate it on miss;
//! writes update the store and then the cache. The cache is never the sole
//! source of truth, so an empty cache only costs a store read.

use bytes::Bytes;
use chrono::Utc;
use mediabroker_cache::MediaCache;
use mediabroker_core::models::{generate_logical_key, MediaRecord, NewMediaRecord};
use mediabroker_core::AppError;
use mediabroker_db::MediaStore;
use mediabroker_storage::{ObjectPayload, ObjectStore, UrlAudience};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Result of a successful `create_media`.
#[derive(Debug)]
pub struct CreatedMedia {
    pub media_id: Uuid,
    pub logical_key: String,
    pub upload_url: String,
}

pub struct MediaLifecycle {
    store: Arc<dyn MediaStore>,
    cache: Arc<dyn MediaCache>,
    objects: Arc<dyn ObjectStore>,
    upload_url_ttl: Duration,
}

impl MediaLifecycle {
    pub fn new(
        store: Arc<dyn MediaStore>,
        cache: Arc<dyn MediaCache>,
        objects: Arc<dyn ObjectStore>,
        upload_url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            objects,
            upload_url_ttl,
        }
    }

    /// Create a media record and hand back a presigned upload URL.
    ///
    /// The logical key is derived from a fresh random token, the owning user
    /// id, and the filename extension; it is inserted with `loaded_at = NULL`
    /// and write-through cached. The upload URL targets the external audience
    /// so the client can PUT directly to the object store.
    pub async fn create_media(
        &self,
        user_id: &str,
        filename: &str,
        size: i64,
        metadata: Option<JsonValue>,
    ) -> Result<CreatedMedia, AppError> {
        let logical_key = generate_logical_key(user_id, filename);

        let record = self
            .store
            .insert(NewMediaRecord {
                user_id: user_id.to_string(),
                logical_key,
                filename: filename.to_string(),
                size,
                metadata: metadata.unwrap_or_else(|| JsonValue::Object(Default::default())),
            })
            .await?;

        self.cache.set(&record.logical_key, record.clone()).await;

        // If presigning fails here the record stays behind with loaded_at
        // forever NULL; nothing targets such records for cleanup.
        let upload_url = self
            .objects
            .presigned_upload_url(&record.logical_key, self.upload_url_ttl, UrlAudience::External)
            .await?;

        tracing::info!(
            media_id = %record.id,
            logical_key = %record.logical_key,
            size = record.size,
            "Created media record"
        );

        Ok(CreatedMedia {
            media_id: record.id,
            logical_key: record.logical_key,
            upload_url,
        })
    }

    /// Confirm the upload finished: set `loaded_at = now` and refresh the
    /// cache entry. Calling this again succeeds and advances the timestamp;
    /// there is deliberately no already-loaded guard.
    pub async fn mark_as_loaded(&self, media_id: Uuid) -> Result<MediaRecord, AppError> {
        let updated = self
            .store
            .set_loaded_at(media_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("media {} not found", media_id)))?;

        self.cache.set(&updated.logical_key, updated.clone()).await;

        tracing::info!(media_id = %media_id, logical_key = %updated.logical_key, "Media marked as loaded");
        Ok(updated)
    }

    /// Direct store read, bypassing the cache. Used to resolve a record
    /// before a server-proxied upload.
    pub async fn get_media_by_id(&self, media_id: Uuid) -> Result<MediaRecord, AppError> {
        self.store
            .find_by_id(media_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("media {} not found", media_id)))
    }

    /// Pass-through put for the server-proxied upload path. Bytes arrive
    /// fully buffered; concurrent proxied uploads are bounded by memory.
    pub async fn upload_file(
        &self,
        logical_key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), AppError> {
        self.objects
            .put_object(logical_key, data, content_type)
            .await?;
        Ok(())
    }

    /// Cache-aside read by logical key: cache hit returns immediately; a miss
    /// reads the store and repopulates the cache before returning.
    pub async fn get_media_by_url(&self, logical_key: &str) -> Result<MediaRecord, AppError> {
        if let Some(record) = self.cache.get(logical_key).await {
            tracing::debug!(logical_key = %logical_key, "Cache hit for media record");
            return Ok(record);
        }

        tracing::debug!(logical_key = %logical_key, "Cache miss for media record, fetching from store");
        let record = self
            .store
            .find_by_key(logical_key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("media with key {} not found", logical_key)))?;

        self.cache.set(logical_key, record.clone()).await;
        Ok(record)
    }

    /// Resolve the record, then stream the object's bytes. The object store
    /// is only consulted once the metadata record is known to exist.
    pub async fn download_file(&self, logical_key: &str) -> Result<ObjectPayload, AppError> {
        let record = self.get_media_by_url(logical_key).await?;
        let payload = self.objects.get_object(&record.logical_key).await?;
        Ok(payload)
    }

    /// Presigned PUT URL for an existing record, for the requested audience.
    pub async fn get_upload_redirect_url(
        &self,
        media_id: Uuid,
        audience: UrlAudience,
    ) -> Result<String, AppError> {
        let record = self.get_media_by_id(media_id).await?;
        let url = self
            .objects
            .presigned_upload_url(&record.logical_key, self.upload_url_ttl, audience)
            .await?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use futures::StreamExt;
    use mediabroker_storage::{collapse_double_slashes, StorageError, StorageResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ----- In-memory capability implementations -----

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<HashMap<Uuid, MediaRecord>>,
        /// Simulates the metadata store becoming unreachable.
        fail_reads: AtomicBool,
    }

    impl MemoryStore {
        fn fail_reads(&self) {
            self.fail_reads.store(true, Ordering::SeqCst);
        }

        fn check_reachable(&self) -> Result<(), AppError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                Err(AppError::Internal("metadata store unreachable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl MediaStore for MemoryStore {
        async fn insert(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
            let mut records = self.records.lock().unwrap();
            if records
                .values()
                .any(|r| r.logical_key == record.logical_key)
            {
                return Err(AppError::DuplicateKey(record.logical_key));
            }
            let stored = MediaRecord {
                id: Uuid::new_v4(),
                user_id: record.user_id,
                logical_key: record.logical_key,
                filename: record.filename,
                size: record.size,
                metadata: record.metadata,
                created_at: Utc::now(),
                loaded_at: None,
            };
            records.insert(stored.id, stored.clone());
            Ok(stored)
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>, AppError> {
            self.check_reachable()?;
            Ok(self.records.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_key(&self, logical_key: &str) -> Result<Option<MediaRecord>, AppError> {
            self.check_reachable()?;
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.logical_key == logical_key)
                .cloned())
        }

        async fn set_loaded_at(
            &self,
            id: Uuid,
            loaded_at: DateTime<Utc>,
        ) -> Result<Option<MediaRecord>, AppError> {
            let mut records = self.records.lock().unwrap();
            Ok(records.get_mut(&id).map(|r| {
                r.loaded_at = Some(loaded_at);
                r.clone()
            }))
        }
    }

    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<HashMap<String, MediaRecord>>,
    }

    #[async_trait]
    impl MediaCache for MemoryCache {
        async fn get(&self, logical_key: &str) -> Option<MediaRecord> {
            self.entries.lock().unwrap().get(logical_key).cloned()
        }

        async fn set(&self, logical_key: &str, record: MediaRecord) {
            self.entries
                .lock()
                .unwrap()
                .insert(logical_key.to_string(), record);
        }
    }

    #[derive(Default)]
    struct MemoryObjects {
        objects: Mutex<HashMap<String, (Bytes, Option<String>)>>,
        calls: AtomicUsize,
    }

    impl MemoryObjects {
        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn object_key(key: &str) -> String {
            key.trim_start_matches('/').to_string()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryObjects {
        async fn presigned_upload_url(
            &self,
            key: &str,
            expires_in: Duration,
            audience: UrlAudience,
        ) -> StorageResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let host = match audience {
                UrlAudience::Internal => "internal.store",
                UrlAudience::External => "external.store",
            };
            Ok(collapse_double_slashes(&format!(
                "http://{}/media/{}?X-Amz-Expires={}",
                host,
                Self::object_key(key),
                expires_in.as_secs()
            )))
        }

        async fn presigned_download_url(
            &self,
            key: &str,
            expires_in: Duration,
        ) -> StorageResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!(
                "http://external.store/media/{}?X-Amz-Expires={}",
                Self::object_key(key),
                expires_in.as_secs()
            ))
        }

        async fn get_object(&self, key: &str) -> StorageResult<ObjectPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let objects = self.objects.lock().unwrap();
            let (data, content_type) = objects
                .get(&Self::object_key(key))
                .cloned()
                .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
            let len = data.len() as u64;
            Ok(ObjectPayload {
                stream: Box::pin(futures::stream::once(async move { Ok(data) })),
                content_type,
                content_length: Some(len),
            })
        }

        async fn put_object(
            &self,
            key: &str,
            data: Bytes,
            content_type: Option<&str>,
        ) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.objects
                .lock()
                .unwrap()
                .insert(Self::object_key(key), (data, content_type.map(String::from)));
            Ok(())
        }

        async fn delete_object(&self, key: &str) -> StorageResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.objects.lock().unwrap().remove(&Self::object_key(key));
            Ok(())
        }

        async fn ensure_bucket_exists(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        cache: Arc<MemoryCache>,
        objects: Arc<MemoryObjects>,
        lifecycle: MediaLifecycle,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(MemoryCache::default());
        let objects = Arc::new(MemoryObjects::default());
        let lifecycle = MediaLifecycle::new(
            store.clone(),
            cache.clone(),
            objects.clone(),
            Duration::from_secs(3600),
        );
        Harness {
            store,
            cache,
            objects,
            lifecycle,
        }
    }

    fn assert_no_double_slash_after_scheme(url: &str) {
        let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
        assert!(!rest.contains("//"), "doubled slashes in {}", url);
    }

    // ----- create_media -----

    #[tokio::test]
    async fn create_media_returns_key_and_upload_url() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        assert!(!created.media_id.is_nil());
        assert!(created.logical_key.starts_with("/u1/"));
        assert!(created.logical_key.ends_with(".jpg"));
        assert!(created.upload_url.contains("external.store"));
        assert!(created.upload_url.contains("X-Amz-Expires=3600"));
        assert_no_double_slash_after_scheme(&created.upload_url);
    }

    #[tokio::test]
    async fn create_media_inserts_pending_record() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        let record = h.lifecycle.get_media_by_id(created.media_id).await.unwrap();
        assert_eq!(record.loaded_at, None);
        assert_eq!(record.filename, "photo.jpg");
        assert_eq!(record.size, 2048);
    }

    #[tokio::test]
    async fn create_media_generates_unique_keys_for_identical_inputs() {
        let h = harness();
        let a = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();
        let b = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();
        assert_ne!(a.logical_key, b.logical_key);
    }

    #[tokio::test]
    async fn create_media_preserves_metadata_bag() {
        let h = harness();
        let meta = serde_json::json!({"width": 1920, "height": 1080});
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, Some(meta.clone()))
            .await
            .unwrap();
        let record = h.lifecycle.get_media_by_id(created.media_id).await.unwrap();
        assert_eq!(record.metadata, meta);
    }

    // ----- mark_as_loaded -----

    #[tokio::test]
    async fn mark_as_loaded_unknown_id_is_not_found() {
        let h = harness();
        let err = h.lifecycle.mark_as_loaded(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn mark_as_loaded_sets_timestamp() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        let before = Utc::now();
        h.lifecycle.mark_as_loaded(created.media_id).await.unwrap();

        let record = h.lifecycle.get_media_by_id(created.media_id).await.unwrap();
        assert!(record.loaded_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn mark_as_loaded_twice_succeeds_and_advances() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        let first = h.lifecycle.mark_as_loaded(created.media_id).await.unwrap();
        let second = h.lifecycle.mark_as_loaded(created.media_id).await.unwrap();
        assert!(second.loaded_at.unwrap() >= first.loaded_at.unwrap());
    }

    #[tokio::test]
    async fn mark_as_loaded_refreshes_cache_entry() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        h.lifecycle.mark_as_loaded(created.media_id).await.unwrap();
        let cached = h.cache.get(&created.logical_key).await.unwrap();
        assert!(cached.loaded_at.is_some());
    }

    // ----- cache-aside reads -----

    #[tokio::test]
    async fn get_media_by_url_is_served_from_cache_after_create() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        // Store goes down right after creation; the write-through entry must
        // still serve the read.
        h.store.fail_reads();
        let record = h
            .lifecycle
            .get_media_by_url(&created.logical_key)
            .await
            .unwrap();
        assert_eq!(record.id, created.media_id);
    }

    #[tokio::test]
    async fn get_media_by_url_repopulates_cache_on_miss() {
        let h = harness();
        let record = h
            .store
            .insert(NewMediaRecord {
                user_id: "u1".to_string(),
                logical_key: "/u1/direct.jpg".to_string(),
                filename: "direct.jpg".to_string(),
                size: 10,
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();

        assert!(h.cache.get("/u1/direct.jpg").await.is_none());
        let fetched = h.lifecycle.get_media_by_url("/u1/direct.jpg").await.unwrap();
        assert_eq!(fetched.id, record.id);
        assert!(h.cache.get("/u1/direct.jpg").await.is_some());
    }

    #[tokio::test]
    async fn get_media_by_url_unknown_key_is_not_found() {
        let h = harness();
        let err = h
            .lifecycle
            .get_media_by_url("/u1/unknown.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    // ----- downloads -----

    #[tokio::test]
    async fn download_unknown_key_never_touches_object_store() {
        let h = harness();
        let err = h
            .lifecycle
            .download_file("/u1/unknown.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(h.objects.call_count(), 0);
    }

    #[tokio::test]
    async fn download_missing_object_is_not_found() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        // Record exists but nothing was ever uploaded.
        let err = h
            .lifecycle
            .download_file(&created.logical_key)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn proxied_upload_then_download_roundtrip() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 4, None)
            .await
            .unwrap();

        h.lifecycle
            .upload_file(&created.logical_key, Bytes::from_static(b"jpeg"), Some("image/jpeg"))
            .await
            .unwrap();

        let payload = h.lifecycle.download_file(&created.logical_key).await.unwrap();
        assert_eq!(payload.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(payload.content_length, Some(4));

        let chunks: Vec<Bytes> = payload
            .stream
            .map(|c| c.unwrap())
            .collect::<Vec<_>>()
            .await;
        let body: Vec<u8> = chunks.concat();
        assert_eq!(body, b"jpeg");
    }

    // ----- upload redirect URLs -----

    #[tokio::test]
    async fn upload_redirect_url_honors_audience() {
        let h = harness();
        let created = h
            .lifecycle
            .create_media("u1", "photo.jpg", 2048, None)
            .await
            .unwrap();

        let internal = h
            .lifecycle
            .get_upload_redirect_url(created.media_id, UrlAudience::Internal)
            .await
            .unwrap();
        let external = h
            .lifecycle
            .get_upload_redirect_url(created.media_id, UrlAudience::External)
            .await
            .unwrap();

        assert!(internal.contains("internal.store"));
        assert!(external.contains("external.store"));
        assert_no_double_slash_after_scheme(&internal);
        assert_no_double_slash_after_scheme(&external);
    }

    #[tokio::test]
    async fn upload_redirect_url_unknown_id_is_not_found() {
        let h = harness();
        let err = h
            .lifecycle
            .get_upload_redirect_url(Uuid::new_v4(), UrlAudience::External)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
