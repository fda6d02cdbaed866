//! cs-gen: topology generation for circuitsynth.
//!
//! Provides:
//! - `Grid`: edge-by-edge placement model and node discovery
//! - `GridGenerator`: seeded, bounded draw-repair-validate loop for level 0
//! - `Validator`: ordered acceptance checks with typed rejection reasons
//! - `Composer`: hierarchical composition over the circuit pool
//! - `SelectionPolicy`: swappable sub-block choice (random, round-robin,
//!   least-used)
//!
//! # Example
//!
//! ```
//! use cs_gen::GridGenerator;
//! use cs_project::GenerationConfig;
//!
//! let config = GenerationConfig::default();
//! let generator = GridGenerator::new(&config).unwrap();
//! match generator.generate(42) {
//!     Ok(generated) => assert_eq!(generated.circuit.level(), 0),
//!     Err(err) => println!("seed 42 exhausted: {err}"),
//! }
//! ```

pub mod composer;
pub mod error;
pub mod generator;
pub mod grid;
pub mod policy;
pub mod validator;

pub use composer::{Composed, Composer};
pub use error::{GenError, GenResult};
pub use generator::{Generated, GridGenerator, IntegratorRule};
pub use grid::{EdgeRef, Grid, Orientation};
pub use policy::{
    LeastUsedPolicy, RandomPolicy, RoundRobinPolicy, SelectionContext, SelectionPolicy,
    policy_for,
};
pub use validator::{RejectReason, Validator, Verdict};
