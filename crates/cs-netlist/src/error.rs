//! Error types for flattening and netlist text.

use cs_graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetlistError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("{kind} cannot be flattened into two-terminal primitives")]
    Unsupported { kind: &'static str },

    #[error("Circuit has no independent voltage source")]
    MissingSource,

    #[error("Sub-block {name} has no '{port}' port")]
    MissingPort { name: String, port: &'static str },

    #[error("Controlled source {name} has no resolvable controller")]
    UnresolvedControl { name: String },

    #[error("Sub-blocks present but no circuit pool was supplied")]
    NoPool,

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type NetlistResult<T> = Result<T, NetlistError>;

pub(crate) fn parse_err(line: usize, message: impl Into<String>) -> NetlistError {
    NetlistError::Parse {
        line,
        message: message.into(),
    }
}
