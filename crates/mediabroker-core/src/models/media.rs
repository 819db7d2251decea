use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A single media item tracked by the broker.
///
/// `logical_key` is the stable path-like identifier (`/{user_id}/{uuid}.{ext}`)
/// used both as the object-store key and as the cache key. It is generated once
/// at creation and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: Uuid,
    pub user_id: String,
    pub logical_key: String,
    pub filename: String,
    pub size: i64,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
    /// Null until the client (or the server-proxied upload path) confirms the
    /// upload finished. Transitions null -> non-null; repeated confirmations
    /// advance the timestamp.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl MediaRecord {
    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }
}

/// Fields supplied by the caller when creating a record. The id and
/// `created_at` are assigned by the metadata store.
#[derive(Debug, Clone)]
pub struct NewMediaRecord {
    pub user_id: String,
    pub logical_key: String,
    pub filename: String,
    pub size: i64,
    pub metadata: JsonValue,
}

/// Extension of `filename`: the text after the last `.`, taken as given.
/// Empty when the filename has no dot. Simple policy, not a parser.
pub fn file_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// Generate a fresh logical key for a user's file: `/{user_id}/{uuid}.{ext}`.
///
/// The random component guarantees uniqueness; the key is never reused.
pub fn generate_logical_key(user_id: &str, filename: &str) -> String {
    let ext = file_extension(filename);
    format!("/{}/{}.{}", user_id, Uuid::new_v4(), ext)
}
