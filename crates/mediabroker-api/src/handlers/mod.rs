pub mod download;
pub mod loading_end;
pub mod media_create;
pub mod upload_redirect;
