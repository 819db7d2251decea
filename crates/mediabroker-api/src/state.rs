//! Application state.
//!
//! All external capabilities (metadata store, cache, object store) are
//! constructed once at process start and injected into the lifecycle
//! coordinator; nothing here is a global or swappable at runtime.

use crate::services::media_lifecycle::MediaLifecycle;
use sqlx::PgPool;
use std::sync::Arc;

pub struct AppState {
    pub lifecycle: Arc<MediaLifecycle>,
    /// Kept alongside the lifecycle for readiness probes.
    pub pool: PgPool,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
