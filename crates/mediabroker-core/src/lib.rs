//! Core domain types for the media broker.
//!
//! This crate holds the `MediaRecord` model, the unified `AppError` type with
//! its HTTP presentation metadata, and the environment-driven configuration.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
