//! Error types for topology generation and composition.

use cs_graph::GraphError;
use thiserror::Error;

use crate::validator::RejectReason;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenError {
    #[error("Generation exhausted after {attempts} attempts (last rejection: {last_reason})")]
    GenerationExhausted {
        attempts: u32,
        last_reason: RejectReason,
    },

    #[error("No sub-block of level {below} available to compose level {level}")]
    PoolExhausted { level: u8, below: u8 },

    #[error("Level {level} cannot be produced here: {what}")]
    InvalidLevel { level: u8, what: &'static str },

    #[error("Invalid generation config: {0}")]
    InvalidConfig(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

pub type GenResult<T> = Result<T, GenError>;
