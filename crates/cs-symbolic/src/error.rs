//! Error types for symbolic derivation.

use cs_core::CsError;
use thiserror::Error;

/// Failures of exact polynomial arithmetic.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgebraError {
    #[error("coefficient overflow")]
    Overflow,

    #[error("division is not exact")]
    Inexact,

    #[error("division by zero polynomial")]
    DivisionByZero,
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeriveError {
    #[error("{components} components exceed the cap of {cap}")]
    ResourceBound { components: usize, cap: usize },

    #[error("derivation exceeded its {budget_ms} ms budget")]
    Timeout { budget_ms: u64 },

    #[error("derivation failed: {reason}")]
    Failed { reason: String },

    #[error("algebra error: {0}")]
    Algebra(#[from] AlgebraError),
}

pub type DeriveResult<T> = Result<T, DeriveError>;

impl DeriveError {
    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        DeriveError::Failed {
            reason: reason.into(),
        }
    }
}

impl From<CsError> for DeriveError {
    fn from(e: CsError) -> Self {
        match e {
            CsError::DeadlineExceeded { budget_ms, .. } => DeriveError::Timeout { budget_ms },
            other => DeriveError::Failed {
                reason: other.to_string(),
            },
        }
    }
}
