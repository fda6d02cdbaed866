//! cs-graph: circuit graph layer for circuitsynth.
//!
//! Provides:
//! - Core data structures (Node, Element, Terminal, Port, Circuit)
//! - Incremental circuit builder with referential validation
//! - Append-only arena of circuits for hierarchical composition
//!
//! # Example
//!
//! ```
//! use cs_components::{ComponentSpec, ElementKind};
//! use cs_graph::{CircuitBuilder, Part};
//!
//! let mut builder = CircuitBuilder::new();
//! let gnd = builder.add_node("0");
//! let top = builder.add_node("1");
//! builder.add_element(Part::Device(ComponentSpec::new(ElementKind::VoltageSource, 1, 5)), top, gnd);
//! builder.add_element(Part::Device(ComponentSpec::new(ElementKind::Resistor, 1, 10)), top, gnd);
//! builder.set_reference(gnd);
//! let circuit = builder.build().unwrap();
//!
//! assert_eq!(circuit.nodes().len(), 2);
//! assert_eq!(circuit.degree(top), 2);
//! ```

pub mod arena;
pub mod builder;
pub mod error;
pub mod graph;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use arena::{CircuitArena, MAX_LEVEL};
pub use builder::CircuitBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{
    BlockRef, Circuit, Element, INPUT_PORT, Node, OUTPUT_PORT, Part, Placement, Port, Terminal,
    TerminalKind,
};
