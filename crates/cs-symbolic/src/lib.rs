//! cs-symbolic: exact symbolic derivation for circuitsynth netlists.
//!
//! Provides:
//! - `Poly`: sparse multivariate polynomials with checked `i128` coefficients
//! - `MnaSystem`: modified nodal analysis stamped over polynomial entries
//! - fraction-free elimination and fast/thorough fraction reduction
//! - `derive`: transfer function and governing equations under a cap and budget
//!
//! # Example
//!
//! ```
//! use cs_netlist::parse_spice;
//! use cs_symbolic::{DerivationStrategy, derive};
//!
//! let text = "\
//! .title divider
//! * input V1
//! * output 2 0 R2
//! * mode symbolic
//! V1 1 0 <Empty>
//! R1 1 2 <Empty>
//! R2 2 0 <Empty>
//! .end
//! ";
//! let netlist = parse_spice(text).unwrap();
//! let set = derive(&netlist, "divider", &DerivationStrategy::default()).unwrap();
//! assert_eq!(set.transfer.expression, "R2/(R1 + R2)");
//! ```

pub mod check;
pub mod derive;
pub mod eliminate;
pub mod error;
pub mod gcd;
pub mod mna;
pub mod poly;
pub mod reduce;

pub use derive::{DerivationStrategy, Relation, SymbolicEquationSet, TransferFunction, derive};
pub use error::{AlgebraError, AlgebraResult, DeriveError, DeriveResult};
pub use mna::{MnaSystem, Unknown};
pub use poly::{Monomial, Poly, Symbols};
pub use reduce::{Rational, SolveMode};
