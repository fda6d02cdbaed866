use thiserror::Error;

pub type CsResult<T> = Result<T, CsError>;

/// Failures shared by every circuitsynth crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },

    #[error("Deadline of {budget_ms} ms exceeded during {what}")]
    DeadlineExceeded { what: &'static str, budget_ms: u64 },
}
