//! Domain-level error taxonomy for mend.

/// Errors produced by the repair pipeline and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum MendError {
    #[error("audit failed: {0}")]
    AuditFailed(String),

    #[error("fix rejected: {0}")]
    FixRejected(String),

    #[error("test generation failed: {0}")]
    TestGenerationFailed(String),

    #[error("test execution failed: {0}")]
    ExecutionFailed(String),

    #[error("unsafe path for write: {0}")]
    UnsafePath(String),

    #[error("LLM backend unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM returned an unusable response: {0}")]
    LlmResponse(String),

    #[error("quality score unavailable: {0}")]
    ScoreUnavailable(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mend domain operations.
pub type Result<T> = std::result::Result<T, MendError>;
