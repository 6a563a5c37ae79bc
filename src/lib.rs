// lib.rs - Main library file that exports all modules
pub mod analytics;
pub mod api_client;
pub mod app;
pub mod brands;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod overlay;
pub mod poller;
pub mod report;
pub mod upload;

// Re-export commonly used types for convenience
pub use api_client::ApiClient;
pub use app::{AppFlow, SessionOutcome, Step};
pub use config::AppConfig;
pub use error::{ClientError, Result};
pub use models::{Logo, MediaFile, ProcessingResult, StatusResponse};
