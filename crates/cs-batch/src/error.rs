//! Error types for the batch orchestrator.
//!
//! Only these abort a batch. Per-circuit failures are tallied as
//! [`FailureKind`](crate::FailureKind) instead.

/// Fatal batch errors.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Rejected before any generation work started.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Circuit pool error: {0}")]
    Pool(String),

    #[error("Worker pool error: {0}")]
    Workers(String),
}

/// Result type for cs-batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

impl From<cs_project::ValidationError> for BatchError {
    fn from(err: cs_project::ValidationError) -> Self {
        BatchError::InvalidConfig(err.to_string())
    }
}

impl From<cs_results::ResultsError> for BatchError {
    fn from(err: cs_results::ResultsError) -> Self {
        BatchError::Results(err.to_string())
    }
}

impl From<cs_graph::GraphError> for BatchError {
    fn from(err: cs_graph::GraphError) -> Self {
        BatchError::Pool(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for BatchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        BatchError::Workers(err.to_string())
    }
}
