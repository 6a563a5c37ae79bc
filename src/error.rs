// src/error.rs
use thiserror::Error;

/// Errors surfaced by the LogoVision client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure talking to the backend.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status. The body is surfaced verbatim.
    #[error("backend error ({status}): {message}")]
    Backend {
        status: reqwest::StatusCode,
        message: String,
    },

    /// File rejected before any upload request was made.
    #[error("{0}")]
    Validation(String),

    /// Backend reported a processing failure for a session.
    #[error("processing failed for session {session_id}: {message}")]
    Processing { session_id: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response format: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// Polling was torn down before a terminal status arrived.
    #[error("polling cancelled for session {0}")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
