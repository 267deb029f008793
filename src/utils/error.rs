//! Error Handling
//!
//! Unified error types for the client.
//! Uses thiserror for ergonomic error definitions.

use meka_core::CoreError;
use thiserror::Error;

/// Message shown when the streaming connection fails or drops.
pub const CONNECTION_FAILED_MESSAGE: &str = "Connection failed.";

/// Client-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Streaming connection failed to open or dropped before a terminal event
    #[error("Connection error: {0}")]
    Connection(String),

    /// A frame or response body did not match the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Explicit error reported by the backend
    #[error("{0}")]
    Backend(String),

    /// Fetching the history list failed
    #[error("History fetch failed: {0}")]
    HistoryFetch(String),

    /// Deleting a history record failed
    #[error("History delete failed: {0}")]
    HistoryDelete(String),

    /// Non-success HTTP status
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    /// Operation exceeded its time budget
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for client errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a history fetch error
    pub fn history_fetch(msg: impl Into<String>) -> Self {
        Self::HistoryFetch(msg.into())
    }

    /// Create a history delete error
    pub fn history_delete(msg: impl Into<String>) -> Self {
        Self::HistoryDelete(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Message suitable for showing to the user in place of a result.
    ///
    /// Transport failures collapse to a generic message; backend errors are
    /// shown verbatim.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Connection(_) | AppError::Timeout(_) => CONNECTION_FAILED_MESSAGE.to_string(),
            AppError::Backend(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Connection(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            AppError::Connection(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            AppError::Protocol(format!("Invalid response body: {}", err))
        } else {
            AppError::Connection(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::Connection(format!("WebSocket error: {}", err))
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Config(format!("Invalid endpoint URL: {}", err))
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownStage(name) => AppError::Protocol(format!("Unknown stage: {}", name)),
        }
    }
}

/// Convert AppError to a string for display layers
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
