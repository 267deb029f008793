//! Core Error Types
//!
//! Defines the foundational error types used across the MEKA workspace.
//! These error types are dependency-free (only thiserror + std) to keep the core
//! crate lightweight.
//!
//! The client crate extends these with transport variants (WebSocket, HTTP,
//! timeouts) that require heavier dependencies.

use thiserror::Error;

/// Core error type for the MEKA workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Unknown pipeline stage name
    #[error("Unknown pipeline stage: {0}")]
    UnknownStage(String),
}

impl CoreError {
    /// Create an unknown stage error
    pub fn unknown_stage(name: impl Into<String>) -> Self {
        Self::UnknownStage(name.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
