use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediabroker_core::models::{MediaRecord, NewMediaRecord};
use mediabroker_core::AppError;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Capability surface of the metadata store.
///
/// One persistent record per media item; `logical_key` is enforced unique at
/// the store level. Implementations must surface a unique-constraint
/// violation as `AppError::DuplicateKey`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Insert a new record; id and `created_at` are assigned by the store.
    async fn insert(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>, AppError>;

    async fn find_by_key(&self, logical_key: &str) -> Result<Option<MediaRecord>, AppError>;

    /// Set `loaded_at` and return the updated record, or `None` when the id
    /// is unknown. Overwrites any prior value; callers decide whether
    /// repeated confirmation is acceptable.
    async fn set_loaded_at(
        &self,
        id: Uuid,
        loaded_at: DateTime<Utc>,
    ) -> Result<Option<MediaRecord>, AppError>;
}

#[derive(FromRow)]
struct MediaRow {
    id: Uuid,
    user_id: String,
    logical_key: String,
    filename: String,
    size: i64,
    metadata: JsonValue,
    created_at: DateTime<Utc>,
    loaded_at: Option<DateTime<Utc>>,
}

impl From<MediaRow> for MediaRecord {
    fn from(row: MediaRow) -> Self {
        MediaRecord {
            id: row.id,
            user_id: row.user_id,
            logical_key: row.logical_key,
            filename: row.filename,
            size: row.size,
            metadata: row.metadata,
            created_at: row.created_at,
            loaded_at: row.loaded_at,
        }
    }
}

/// Postgres-backed media store.
#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map an insert failure, turning a unique violation on `logical_key`
/// (SQLSTATE 23505) into its own error kind.
fn map_insert_error(err: sqlx::Error, logical_key: &str) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some("23505") {
            tracing::warn!(logical_key = %logical_key, "Duplicate logical key on insert");
            return AppError::DuplicateKey(format!(
                "media with logical key {} already exists",
                logical_key
            ));
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn insert(&self, record: NewMediaRecord) -> Result<MediaRecord, AppError> {
        // Dynamic queries: no DATABASE_URL / sqlx prepare required at build time.
        let row = sqlx::query_as::<_, MediaRow>(
            r#"
            INSERT INTO media (user_id, logical_key, filename, size, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, logical_key, filename, size, metadata, created_at, loaded_at
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.logical_key)
        .bind(&record.filename)
        .bind(record.size)
        .bind(&record.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &record.logical_key))?;

        tracing::debug!(
            media_id = %row.id,
            logical_key = %row.logical_key,
            "Inserted media record"
        );

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<_, MediaRow>(
            r#"
            SELECT id, user_id, logical_key, filename, size, metadata, created_at, loaded_at
            FROM media
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_key(&self, logical_key: &str) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<_, MediaRow>(
            r#"
            SELECT id, user_id, logical_key, filename, size, metadata, created_at, loaded_at
            FROM media
            WHERE logical_key = $1
            "#,
        )
        .bind(logical_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn set_loaded_at(
        &self,
        id: Uuid,
        loaded_at: DateTime<Utc>,
    ) -> Result<Option<MediaRecord>, AppError> {
        let row = sqlx::query_as::<_, MediaRow>(
            r#"
            UPDATE media
            SET loaded_at = $2
            WHERE id = $1
            RETURNING id, user_id, logical_key, filename, size, metadata, created_at, loaded_at
            "#,
        )
        .bind(id)
        .bind(loaded_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ref updated) = row {
            tracing::debug!(media_id = %updated.id, "Set loaded_at on media record");
        }

        Ok(row.map(Into::into))
    }
}
