//! Object storage abstraction and its S3-compatible implementation.
//!
//! The `ObjectStore` trait is the uniform capability surface over an
//! S3-compatible backend: presigned URL issuance, object get/put/delete, and
//! bucket provisioning. Keys handed to this crate are logical keys of the
//! form `/{user_id}/{filename}`; the backend strips the leading `/` so that
//! puts, gets, and presigned URLs all address the same object.

pub mod s3;
pub mod traits;

pub use s3::{collapse_double_slashes, S3ObjectStore, S3Settings};
pub use traits::{ObjectPayload, ObjectStore, StorageError, StorageResult, UrlAudience};
