//! Core error types.

use thiserror::Error;

/// Errors surfaced by classification, thread analysis and recording.
///
/// Memory-service failures never appear here: they are logged and dropped at
/// the call site so classification can continue without them.
#[derive(Debug, Error)]
pub enum TriageError {
    /// A thread must contain at least one message.
    #[error("thread has no messages")]
    EmptyThread,

    /// The message that triggered classification was not supplied.
    #[error("thread input is missing its trigger message")]
    MissingTrigger,

    /// The language model call failed (transport, provider, timeout).
    #[error("language model call failed: {0}")]
    Llm(#[source] anyhow::Error),

    /// The language model answered with something outside the response schema.
    #[error("invalid language model output: {0}")]
    InvalidLlmOutput(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while loading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The misclassification store rejected a record.
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, TriageError>;
