//! Error types for catalog operations.

use cs_core::error::CsError;
use thiserror::Error;

/// Errors raised while building specs or palettes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("{kind} cannot be placed on a grid edge")]
    NotPlaceable { kind: &'static str },

    #[error("{kind} cannot carry a {measure} probe")]
    ProbeConflict {
        kind: &'static str,
        measure: &'static str,
    },

    #[error("Empty distribution: {what}")]
    EmptyDistribution { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<ComponentError> for CsError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::NotPlaceable { kind } => CsError::InvalidArg { what: kind },
            ComponentError::ProbeConflict { kind, .. } => CsError::InvalidArg { what: kind },
            ComponentError::EmptyDistribution { what } => CsError::InvalidArg { what },
            ComponentError::InvalidArg { what } => CsError::InvalidArg { what },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::ProbeConflict {
            kind: "voltage source",
            measure: "voltage",
        };
        assert!(err.to_string().contains("voltage source"));
    }

    #[test]
    fn error_conversion() {
        let comp_err = ComponentError::InvalidArg { what: "test" };
        let cs_err: CsError = comp_err.into();
        assert!(matches!(cs_err, CsError::InvalidArg { .. }));
    }
}
