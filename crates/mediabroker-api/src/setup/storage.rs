//! Object storage setup

use anyhow::{Context, Result};
use mediabroker_core::Config;
use mediabroker_storage::{ObjectStore, S3ObjectStore, S3Settings};
use std::sync::Arc;

/// Build the S3 clients and make sure the bucket exists.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn ObjectStore>> {
    let store = S3ObjectStore::new(S3Settings {
        bucket: config.s3_bucket.clone(),
        region: config.s3_region.clone(),
        endpoint: config.s3_endpoint.clone(),
        external_endpoint: config.s3_external_endpoint.clone(),
    })
    .await
    .context("Failed to initialize object storage client")?;

    // Logs and continues on failure; a missing bucket surfaces per-request.
    store
        .ensure_bucket_exists()
        .await
        .context("Bucket existence check failed")?;

    tracing::info!(
        bucket = %config.s3_bucket,
        endpoint = %config.s3_endpoint,
        external_endpoint = %config.s3_external_endpoint,
        "Object storage initialized"
    );

    Ok(Arc::new(store))
}
