//! Structural and electrical acceptance checks for candidate circuits.
//!
//! Checks run in a fixed order and the first failure wins:
//! connectivity, terminal degree, forced element counts, shorted or
//! dangling elements, probe conflicts and controller resolution, loops of
//! voltage-defined branches, sections held only by current sources, and
//! finally sub-block port arity.
//!
//! Integrators are counted through every embedded block, since a nested
//! circuit flattens into one netlist.

use cs_components::{ElementKind, Measure};
use cs_core::NodeId;
use cs_graph::{Circuit, CircuitArena, Element, INPUT_PORT, Part};
use cs_project::GenerationConfig;
use petgraph::unionfind::UnionFind;
use thiserror::Error;

/// Why a candidate was discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("no candidate was attempted")]
    NotAttempted,

    #[error("circuit has {sections} separate sections")]
    Disconnected { sections: usize },

    #[error("node {node} has only {degree} incident terminal(s)")]
    DanglingNode { node: String, degree: usize },

    #[error("expected exactly one independent source, found {found}")]
    SourceCount { found: usize },

    #[error("forced RLC circuit has no capacitor or inductor")]
    MissingReactive,

    #[error("expected exactly one integrator, found {found}")]
    IntegratorCount { found: usize },

    #[error("op-amp {name} drives the reference node")]
    GroundedOpAmpOutput { name: String },

    #[error("element {name} has both terminals on one node")]
    ShortedElement { name: String },

    #[error("source {name} has a floating terminal")]
    DanglingSource { name: String },

    #[error("element {name} cannot carry a {measure} probe")]
    ProbeConflict { name: String, measure: &'static str },

    #[error("controlled source {name} resolves to {matches} controlling probes")]
    UnresolvedControl { name: String, matches: usize },

    #[error("sub-block {name} has no usable '{port}' port")]
    BadPort { name: String, port: &'static str },

    #[error("sub-block {name} is not in the pool")]
    UnknownBlock { name: String },

    #[error("{found} controlled sources drawn, allowed range is {min}..={max}")]
    DependentSourceCount { found: usize, min: usize, max: usize },

    #[error("no edge can host the {what}")]
    NoSite { what: &'static str },

    #[error("{found} probes exceed the {max} available labels")]
    TooManyProbes { found: usize, max: usize },

    #[error("{name} closes a loop of voltage-defined branches")]
    VoltageLoop { name: String },

    #[error("node {node} reaches the reference only through current sources")]
    CurrentCutset { node: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl From<Result<(), RejectReason>> for Verdict {
    fn from(result: Result<(), RejectReason>) -> Self {
        match result {
            Ok(()) => Verdict::Accept,
            Err(reason) => Verdict::Reject(reason),
        }
    }
}

/// Checks a candidate against the active generation options.
///
/// `pool` is required only for circuits embedding sub-blocks.
pub struct Validator<'a> {
    config: &'a GenerationConfig,
    pool: Option<&'a CircuitArena>,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a GenerationConfig) -> Self {
        Self { config, pool: None }
    }

    pub fn with_pool(mut self, pool: &'a CircuitArena) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn check(&self, circuit: &Circuit) -> Verdict {
        self.run(circuit).into()
    }

    fn run(&self, circuit: &Circuit) -> Result<(), RejectReason> {
        check_connectivity(circuit)?;
        check_degrees(circuit)?;
        check_forced_counts(circuit, self.config)?;
        if self.config.integrator {
            let found = self.integrators(circuit)?;
            if found != 1 {
                return Err(RejectReason::IntegratorCount { found });
            }
        }
        check_shorts(circuit)?;
        check_probes(circuit)?;
        check_voltage_loops(circuit)?;
        check_current_cutsets(circuit)?;
        self.check_ports(circuit)
    }

    /// Integrators in `circuit` and in every block nested inside it.
    fn integrators(&self, circuit: &Circuit) -> Result<usize, RejectReason> {
        let mut found = circuit.count(ElementKind::OpAmpIntegrator);
        for (elem, block) in circuit.sub_blocks() {
            let Some(child) = self.pool.and_then(|p| p.get(block.circuit)) else {
                return Err(RejectReason::UnknownBlock {
                    name: elem.part.name(),
                });
            };
            found += self.integrators(&child)?;
        }
        Ok(found)
    }

    fn check_ports(&self, circuit: &Circuit) -> Result<(), RejectReason> {
        for (elem, block) in circuit.sub_blocks() {
            let name = elem.part.name();
            let Some(child) = self.pool.and_then(|p| p.get(block.circuit)) else {
                return Err(RejectReason::UnknownBlock { name });
            };
            match child.port(INPUT_PORT) {
                Some(port) if port.pos != port.neg => {}
                _ => {
                    return Err(RejectReason::BadPort {
                        name,
                        port: INPUT_PORT,
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_connectivity(circuit: &Circuit) -> Result<(), RejectReason> {
    let sections = circuit.connected_sections();
    if sections != 1 {
        return Err(RejectReason::Disconnected { sections });
    }
    Ok(())
}

/// Every node, port nodes included, needs two terminals.
fn check_degrees(circuit: &Circuit) -> Result<(), RejectReason> {
    for node in circuit.nodes() {
        let degree = circuit.degree(node.id);
        if degree < 2 {
            return Err(RejectReason::DanglingNode {
                node: node.name.clone(),
                degree,
            });
        }
    }
    Ok(())
}

fn check_forced_counts(circuit: &Circuit, config: &GenerationConfig) -> Result<(), RejectReason> {
    let sources = circuit.count_where(ElementKind::is_independent_source);
    if sources != 1 {
        return Err(RejectReason::SourceCount { found: sources });
    }
    if config.rlc && circuit.count_where(ElementKind::is_reactive) == 0 {
        return Err(RejectReason::MissingReactive);
    }
    for elem in circuit.elements().iter().filter(|e| e.kind().is_opamp()) {
        if let Some((_, out)) = circuit.element_nodes(elem.id)
            && out == circuit.reference()
        {
            return Err(RejectReason::GroundedOpAmpOutput {
                name: elem.part.name(),
            });
        }
    }
    Ok(())
}

fn check_shorts(circuit: &Circuit) -> Result<(), RejectReason> {
    for elem in circuit.elements() {
        let Some((pos, neg)) = circuit.element_nodes(elem.id) else {
            continue;
        };
        if pos == neg && !elem.kind().is_wiring() {
            return Err(RejectReason::ShortedElement {
                name: elem.part.name(),
            });
        }
        if elem.kind().is_independent_source()
            && (circuit.degree(pos) < 2 || circuit.degree(neg) < 2)
        {
            return Err(RejectReason::DanglingSource {
                name: elem.part.name(),
            });
        }
    }
    Ok(())
}

fn check_probes(circuit: &Circuit) -> Result<(), RejectReason> {
    let specs: Vec<_> = circuit
        .elements()
        .iter()
        .filter_map(|e| e.part.spec())
        .collect();

    for spec in &specs {
        if spec.check_probe().is_err() {
            return Err(RejectReason::ProbeConflict {
                name: spec.name(),
                measure: spec.probe.measure.describe(),
            });
        }
    }

    for elem in circuit.elements() {
        let Part::Device(spec) = &elem.part else {
            continue;
        };
        let Some(measure) = spec.kind.controller_measure() else {
            continue;
        };
        let matches = probe_matches(&specs, measure, spec.control);
        if matches != 1 || elem.control.is_none() {
            return Err(RejectReason::UnresolvedControl {
                name: spec.name(),
                matches,
            });
        }
    }
    Ok(())
}

/// Nodes whose voltage difference an element fixes independently of its
/// current. Probed wires are zero-volt ammeters; an op-amp fixes its output
/// against the reference.
fn voltage_branch(circuit: &Circuit, elem: &Element) -> Option<(NodeId, NodeId)> {
    let (pos, neg) = circuit.element_nodes(elem.id)?;
    match elem.part.spec()?.kind {
        ElementKind::VoltageSource
        | ElementKind::Vcvs
        | ElementKind::Ccvs
        | ElementKind::Short => Some((pos, neg)),
        kind if kind.is_opamp() => Some((neg, circuit.reference())),
        _ => None,
    }
}

fn is_current_defined(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::CurrentSource | ElementKind::Vccs | ElementKind::Cccs
    )
}

/// Op-amp stages that reach their input terminal through a resistor or
/// capacitor; the others sense it without drawing current.
fn loads_input(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::OpAmpInverting
            | ElementKind::OpAmpSumming
            | ElementKind::OpAmpIntegrator
            | ElementKind::OpAmpDifferentiator
    )
}

fn check_voltage_loops(circuit: &Circuit) -> Result<(), RejectReason> {
    let mut joined = UnionFind::<usize>::new(circuit.nodes().len());
    for elem in circuit.elements() {
        if let Some((a, b)) = voltage_branch(circuit, elem)
            && !joined.union(a.idx(), b.idx())
        {
            return Err(RejectReason::VoltageLoop {
                name: elem.part.name(),
            });
        }
    }
    Ok(())
}

/// Sections joined to the rest only by current-defined branches float:
/// shifting all their node voltages together changes no equation unless a
/// controlling voltage spans the cut.
fn check_current_cutsets(circuit: &Circuit) -> Result<(), RejectReason> {
    let reference = circuit.reference();
    let mut joined = UnionFind::<usize>::new(circuit.nodes().len());
    let mut sensed: Vec<(NodeId, NodeId)> = Vec::new();

    for elem in circuit.elements() {
        let Some((pos, neg)) = circuit.element_nodes(elem.id) else {
            continue;
        };
        let kind = elem.kind();
        if kind.controller_measure() == Some(Measure::Voltage)
            && let Some(pair) = elem.control.and_then(|c| circuit.element_nodes(c))
        {
            sensed.push(pair);
        }
        if is_current_defined(kind) {
            continue;
        }
        if kind.is_opamp() {
            joined.union(neg.idx(), reference.idx());
            if loads_input(kind) {
                joined.union(pos.idx(), neg.idx());
            } else {
                sensed.push((pos, neg));
            }
        } else {
            joined.union(pos.idx(), neg.idx());
        }
    }

    let ground = joined.find(reference.idx());
    for node in circuit.nodes() {
        let section = joined.find(node.id.idx());
        if section == ground {
            continue;
        }
        let held = sensed
            .iter()
            .any(|(a, b)| (joined.find(a.idx()) == section) != (joined.find(b.idx()) == section));
        if !held {
            return Err(RejectReason::CurrentCutset {
                node: node.name.clone(),
            });
        }
    }
    Ok(())
}

fn probe_matches(
    specs: &[&cs_components::ComponentSpec],
    measure: Measure,
    label: Option<u8>,
) -> usize {
    let Some(label) = label else {
        return 0;
    };
    specs
        .iter()
        .filter(|s| s.probe.measure == measure && s.probe.label == Some(label))
        .count()
}
