//! Batch orchestrator for circuitsynth.
//!
//! Drives generation, composition, netlist emission and derivation over many
//! circuits, collecting successes into a dataset and tallying failures by
//! kind. Only an invalid configuration (or a dataset write failure) aborts a
//! batch; everything else is counted and skipped.

pub mod batch;
pub mod error;
pub mod failure;
pub mod progress;

pub use batch::{
    BatchReport, Sample, dataset_manifest, run_batch, run_levels, strategy_for,
};
pub use error::{BatchError, BatchResult};
pub use failure::{FailureKind, FailureTally};
pub use progress::{BatchProgressEvent, BatchStage};
