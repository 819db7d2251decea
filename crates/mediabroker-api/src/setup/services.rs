//! Service wiring: capability implementations into the lifecycle coordinator.

use crate::services::media_lifecycle::MediaLifecycle;
use crate::state::AppState;
use anyhow::Result;
use mediabroker_cache::{MediaCache, MokaMediaCache};
use mediabroker_core::Config;
use mediabroker_db::{MediaStore, PgMediaStore};
use mediabroker_storage::ObjectStore;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    object_store: Arc<dyn ObjectStore>,
) -> Result<Arc<AppState>> {
    let store: Arc<dyn MediaStore> = Arc::new(PgMediaStore::new(pool.clone()));
    let cache: Arc<dyn MediaCache> = Arc::new(MokaMediaCache::new(
        Duration::from_secs(config.cache_ttl_seconds),
        config.cache_max_capacity,
    ));

    let lifecycle = Arc::new(MediaLifecycle::new(
        store,
        cache,
        object_store,
        Duration::from_secs(config.upload_url_ttl_seconds),
    ));

    tracing::info!(
        cache_ttl_seconds = config.cache_ttl_seconds,
        cache_max_capacity = config.cache_max_capacity,
        upload_url_ttl_seconds = config.upload_url_ttl_seconds,
        "Services initialized"
    );

    Ok(Arc::new(AppState { lifecycle, pool }))
}
