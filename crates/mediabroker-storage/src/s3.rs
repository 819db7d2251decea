use crate::traits::{ObjectPayload, ObjectStore, StorageError, StorageResult, UrlAudience};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::StreamExt;
use std::time::Duration;
use tokio_util::io::ReaderStream;

/// Connection settings for an S3-compatible backend.
///
/// `endpoint` is the internally-routable address used for object operations;
/// `external_endpoint` is the client-reachable address embedded in presigned
/// URLs handed back to callers. Same bucket, same credentials.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub external_endpoint: String,
}

/// S3-compatible object store (AWS S3, MinIO, DigitalOcean Spaces, ...).
///
/// Holds two clients differing only in endpoint: one for object operations
/// and internal presigning, one for externally-consumable presigned URLs.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    external_client: Client,
    bucket: String,
    region: String,
}

impl S3ObjectStore {
    pub async fn new(settings: S3Settings) -> StorageResult<Self> {
        if settings.bucket.trim().is_empty() {
            return Err(StorageError::ConfigError("bucket name is empty".to_string()));
        }

        // Some backends reject service-style hostnames; resolve the internal
        // endpoint to an IP up front, falling back to the literal hostname.
        let internal_endpoint = resolve_endpoint_host(&settings.endpoint).await;

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .load()
            .await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .endpoint_url(internal_endpoint)
                .force_path_style(true)
                .build(),
        );
        let external_client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .endpoint_url(settings.external_endpoint.clone())
                .force_path_style(true)
                .build(),
        );

        Ok(S3ObjectStore {
            client,
            external_client,
            bucket: settings.bucket,
            region: settings.region,
        })
    }

    /// Logical keys carry a leading `/`; S3 object keys must not, or every
    /// generated URL would contain a doubled separator and presigned PUTs
    /// would address a different object than gets.
    fn object_key(key: &str) -> &str {
        key.trim_start_matches('/')
    }

    fn presigning_config(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))
    }
}

/// Resolve the hostname part of `endpoint` (e.g. `http://minio:9000`) to a
/// concrete IP address. Resolution failure is a warning, not an error: the
/// endpoint is used as-is and startup continues.
pub(crate) async fn resolve_endpoint_host(endpoint: &str) -> String {
    let Some((scheme, rest)) = endpoint.split_once("://") else {
        return endpoint.to_string();
    };
    let rest = rest.trim_end_matches('/');
    let (host, port) = match rest.split_once(':') {
        Some((h, p)) => (h, Some(p)),
        None => (rest, None),
    };

    if host == "localhost" || host.parse::<std::net::IpAddr>().is_ok() {
        return endpoint.to_string();
    }

    let default_port = if scheme == "https" { "443" } else { "80" };
    let lookup_target = format!("{}:{}", host, port.unwrap_or(default_port));

    match tokio::net::lookup_host(lookup_target).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => {
                tracing::info!(host = %host, ip = %addr.ip(), "Resolved storage endpoint");
                match port {
                    Some(p) => format!("{}://{}:{}", scheme, addr.ip(), p),
                    None => format!("{}://{}", scheme, addr.ip()),
                }
            }
            None => {
                tracing::warn!(host = %host, "No address for storage endpoint, using as-is");
                endpoint.to_string()
            }
        },
        Err(e) => {
            tracing::warn!(host = %host, error = %e, "Failed to resolve storage endpoint, using as-is");
            endpoint.to_string()
        }
    }
}

/// Collapse any `//` in a URL to `/`, leaving the `://` after the scheme
/// intact. Presigned URLs are passed through this before leaving the adapter.
pub fn collapse_double_slashes(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((s, r)) => (Some(s), r),
        None => (None, url),
    };

    let mut out = String::with_capacity(rest.len());
    let mut prev_was_slash = false;
    for c in rest.chars() {
        if c == '/' {
            if prev_was_slash {
                continue;
            }
            prev_was_slash = true;
        } else {
            prev_was_slash = false;
        }
        out.push(c);
    }

    match scheme {
        Some(s) => format!("{}://{}", s, out),
        None => out,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presigned_upload_url(
        &self,
        key: &str,
        expires_in: Duration,
        audience: UrlAudience,
    ) -> StorageResult<String> {
        let client = match audience {
            UrlAudience::Internal => &self.client,
            UrlAudience::External => &self.external_client,
        };

        let presigned = client
            .put_object()
            .bucket(&self.bucket)
            .key(Self::object_key(key))
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Presigned upload URL generation failed"
                );
                StorageError::PresignFailed(e.to_string())
            })?;

        Ok(collapse_double_slashes(presigned.uri()))
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(Self::object_key(key))
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(collapse_double_slashes(presigned.uri()))
    }

    async fn get_object(&self, key: &str) -> StorageResult<ObjectPayload> {
        let start = std::time::Instant::now();
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(Self::object_key(key))
            .send()
            .await
            .map_err(|e| {
                if matches!(&e, SdkError::ServiceError(se) if se.err().is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 get failed"
                    );
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let content_length = output.content_length().and_then(|l| u64::try_from(l).ok());

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            content_length = ?content_length,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get started streaming"
        );

        let stream = ReaderStream::new(output.body.into_async_read())
            .map(|chunk| chunk.map_err(|e| StorageError::DownloadFailed(e.to_string())));

        Ok(ObjectPayload {
            stream: Box::pin(stream),
            content_type,
            content_length,
        })
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(Self::object_key(key))
            .body(ByteStream::from(data))
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(Self::object_key(key))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 delete failed");
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(bucket = %self.bucket, key = %key, "S3 delete successful");
        Ok(())
    }

    async fn ensure_bucket_exists(&self) -> StorageResult<()> {
        match self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, "Bucket already exists");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(bucket = %self.bucket, error = %e, "Bucket head failed, attempting create");
            }
        }

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != "us-east-1" {
            let constraint = BucketLocationConstraint::from(self.region.as_str());
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, region = %self.region, "Bucket created");
                Ok(())
            }
            Err(e) => {
                // Non-fatal: subsequent object operations fail naturally if
                // the bucket really is missing.
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    "Error checking/creating bucket"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_preserves_scheme_separator() {
        assert_eq!(
            collapse_double_slashes("http://host:9000/bucket//u1/f.jpg"),
            "http://host:9000/bucket/u1/f.jpg"
        );
    }

    #[test]
    fn collapse_handles_runs_of_slashes() {
        assert_eq!(
            collapse_double_slashes("https://h/b///k////x"),
            "https://h/b/k/x"
        );
    }

    #[test]
    fn collapse_leaves_clean_urls_alone() {
        let url = "https://host/bucket/u1/f.jpg?X-Amz-Expires=3600";
        assert_eq!(collapse_double_slashes(url), url);
    }

    #[test]
    fn object_key_strips_leading_slash() {
        assert_eq!(S3ObjectStore::object_key("/u1/f.jpg"), "u1/f.jpg");
        assert_eq!(S3ObjectStore::object_key("u1/f.jpg"), "u1/f.jpg");
    }

    #[tokio::test]
    async fn resolve_keeps_localhost_and_ips() {
        assert_eq!(
            resolve_endpoint_host("http://localhost:9000").await,
            "http://localhost:9000"
        );
        assert_eq!(
            resolve_endpoint_host("http://127.0.0.1:9000").await,
            "http://127.0.0.1:9000"
        );
    }

    #[tokio::test]
    async fn resolve_falls_back_on_unresolvable_host() {
        let endpoint = "http://no-such-host.invalid:9000";
        assert_eq!(resolve_endpoint_host(endpoint).await, endpoint);
    }

    #[tokio::test]
    async fn resolve_falls_back_without_explicit_port() {
        // Exercises the default-port lookup target construction.
        let endpoint = "https://no-such-host.invalid";
        assert_eq!(resolve_endpoint_host(endpoint).await, endpoint);
    }

    #[tokio::test]
    async fn resolve_passes_through_schemeless_endpoint() {
        assert_eq!(resolve_endpoint_host("not-a-url").await, "not-a-url");
    }
}
