//! cs-results: dataset storage for generated circuits and their equations.

pub mod hash;
pub mod stats;
pub mod store;
pub mod types;

pub use hash::compute_circuit_id;
pub use stats::{ElementStats, element_stats};
pub use store::DatasetStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset not found: {path}")]
    DatasetNotFound { path: String },

    #[error("{file}:{line}: {source}")]
    Record {
        file: &'static str,
        line: usize,
        source: serde_json::Error,
    },
}
