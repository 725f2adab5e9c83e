//! Error types for the booking core.

use thiserror::Error;

/// Errors that can occur inside the message-processing pipeline.
///
/// Nothing here escapes the orchestrator boundary; every variant is
/// converted into a user-facing outcome before the caller sees it.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model provider error: {0}")]
    Model(String),
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error("tool-use loop exceeded {limit} rounds")]
    ToolLoopExceeded { limit: u32 },
    #[error("session store error: {0}")]
    Store(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Convenience result type for core operations.
pub type EngineResult<T> = Result<T, EngineError>;
