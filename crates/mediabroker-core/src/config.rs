//! Configuration module
//!
//! Environment-driven configuration for the broker: server, database, object
//! storage endpoints, cache, and auth settings.

use std::env;

// Defaults
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const CACHE_TTL_SECONDS: u64 = 900;
const CACHE_MAX_CAPACITY: u64 = 10_000;
const UPLOAD_URL_TTL_SECONDS: u64 = 3600;
const MAX_UPLOAD_SIZE_MB: usize = 100;

/// Application configuration, loaded once at process start.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    // Object storage
    pub s3_bucket: String,
    pub s3_region: String,
    /// Endpoint reachable from inside the deployment network (e.g. a Docker
    /// service hostname). Used for object operations and internal presigning.
    pub s3_endpoint: String,
    /// Endpoint reachable by external clients; embedded in presigned upload
    /// URLs handed back to callers.
    pub s3_external_endpoint: String,
    // Cache
    pub cache_ttl_seconds: u64,
    pub cache_max_capacity: u64,
    // Upload
    pub upload_url_ttl_seconds: u64,
    pub max_upload_size_bytes: usize,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production = environment.to_lowercase() == "production"
            || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "media".to_string()),
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: env::var("S3_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            s3_external_endpoint: env::var("S3_EXTERNAL_ENDPOINT")
                .or_else(|_| env::var("S3_ENDPOINT"))
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            cache_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| CACHE_TTL_SECONDS.to_string())
                .parse()
                .unwrap_or(CACHE_TTL_SECONDS),
            cache_max_capacity: env::var("CACHE_MAX_CAPACITY")
                .unwrap_or_else(|_| CACHE_MAX_CAPACITY.to_string())
                .parse()
                .unwrap_or(CACHE_MAX_CAPACITY),
            upload_url_ttl_seconds: env::var("UPLOAD_URL_TTL_SECONDS")
                .unwrap_or_else(|_| UPLOAD_URL_TTL_SECONDS.to_string())
                .parse()
                .unwrap_or(UPLOAD_URL_TTL_SECONDS),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
        })
    }

    /// Fail fast on configuration that would only surface as runtime errors.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.s3_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("S3_BUCKET cannot be empty"));
        }
        if self.jwt_secret.len() < 16 && self.is_production() {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 16 characters in production"
            ));
        }
        if self.cache_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("CACHE_TTL_SECONDS must be greater than 0"));
        }
        Ok(())
    }
}
