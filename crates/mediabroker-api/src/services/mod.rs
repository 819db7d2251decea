pub mod media_lifecycle;
