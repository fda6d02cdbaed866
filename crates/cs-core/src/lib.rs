//! cs-core: stable foundation for circuitsynth.
//!
//! Contains:
//! - ids (stable compact IDs for circuit objects)
//! - numeric (float helpers used by numeric cross-checks)
//! - timing (timers and cooperative deadlines)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CsError, CsResult};
pub use ids::*;
pub use numeric::*;
pub use timing::{AccumulatingTimer, Deadline};
