//! cs-netlist: flattened netlists for circuitsynth.
//!
//! Provides:
//! - `Netlist` model with canonical node numbering
//! - `flatten`: hierarchical circuit -> single-level netlist
//! - SPICE-style text rendering and parsing
//!
//! # Example
//!
//! ```
//! use cs_components::{ComponentSpec, ElementKind};
//! use cs_graph::{CircuitBuilder, Part};
//! use cs_netlist::{FlattenOptions, flatten, parse_spice, to_spice};
//!
//! let mut b = CircuitBuilder::new();
//! let gnd = b.add_node("0");
//! let top = b.add_node("1");
//! b.add_element(Part::Device(ComponentSpec::new(ElementKind::VoltageSource, 1, 5)), top, gnd);
//! b.add_element(Part::Device(ComponentSpec::new(ElementKind::Resistor, 1, 10)), top, gnd);
//! b.set_reference(gnd);
//! let circuit = b.build().unwrap();
//!
//! let netlist = flatten(&circuit, None, &FlattenOptions::default()).unwrap();
//! let text = to_spice(&netlist);
//! assert!(text.contains("R1 1 0 <Empty>"));
//! assert_eq!(parse_spice(&text).unwrap(), netlist);
//! ```

pub mod error;
pub mod flatten;
pub mod model;
pub mod spice;

pub use error::{NetlistError, NetlistResult};
pub use flatten::{FlattenOptions, flatten};
pub use model::{
    Analysis, EMPTY_VALUE, NetControl, NetElement, NetKind, NetProbe, Netlist, OPAMP_GAIN,
    OPAMP_GAIN_VALUE, OutputRef, ProbeTarget,
};
pub use spice::{parse_spice, to_spice};
