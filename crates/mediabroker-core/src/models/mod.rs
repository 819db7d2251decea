mod media;

pub use media::{file_extension, generate_logical_key, MediaRecord, NewMediaRecord};
