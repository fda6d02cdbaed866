//! cs-components: the element catalog for generated circuits.
//!
//! Provides the vocabulary every other crate speaks:
//! - `ElementKind`: resistors, reactive elements, sources, controlled sources,
//!   op-amp configurations, small-signal transistor blocks and sub-blocks
//! - `Measure`/`Probe`: measurement annotations attached to grid edges
//! - `ComponentSpec`: an immutable placed element with label, value and polarity
//! - `Palette`/`GridSizes`: weighted placement distributions
//!
//! # Example
//!
//! ```
//! use cs_components::{ComponentSpec, ElementKind};
//!
//! let r = ComponentSpec::new(ElementKind::Resistor, 2, 47);
//! assert_eq!(r.name(), "R2");
//! assert_eq!(r.symbol(), "R2");
//!
//! let gain = ComponentSpec::new(ElementKind::Vccs, 1, 3).with_control(4);
//! assert_eq!(gain.symbol(), "y_1");
//! ```

pub mod error;
pub mod kind;
pub mod palette;
pub mod spec;

// Re-exports
pub use error::{ComponentError, ComponentResult};
pub use kind::{ElementKind, Measure};
pub use palette::{GridSizes, Palette, WeightTable};
pub use spec::{ComponentSpec, Probe};
