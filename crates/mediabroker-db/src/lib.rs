//! Metadata store for media records.
//!
//! Exposes the `MediaStore` capability trait and its Postgres implementation.

mod media;

pub use media::{MediaStore, PgMediaStore};
