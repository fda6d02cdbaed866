//! Flattening of (possibly hierarchical) circuits into a single netlist.
//!
//! Every sub-block is expanded in place: its input port is identified with
//! the nodes of the parent element it replaces, its driving source is
//! dropped, and its remaining nodes get fresh indices. Op-amp configurations
//! expand into passives around an ideal op-amp, and current probes become
//! zero-volt ammeters in series with the probed element.
//!
//! Controls are resolved in a second pass so a controlled source may read an
//! ammeter that is emitted after it.

use std::collections::HashMap;

use cs_components::{ComponentSpec, ElementKind, Measure};
use cs_core::ElemId;
use cs_graph::{BlockRef, Circuit, CircuitArena, Element, GraphError, INPUT_PORT, Part};
use tracing::debug;

use crate::error::{NetlistError, NetlistResult};
use crate::model::{
    Analysis, NetControl, NetElement, NetKind, NetProbe, Netlist, OPAMP_GAIN, OPAMP_GAIN_VALUE,
    OutputRef, ProbeTarget,
};

#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Write parameter names instead of numeric values.
    pub symbolic: bool,
    /// Force AC analysis even without reactive elements.
    pub rlc: bool,
    pub title: String,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            symbolic: true,
            rlc: false,
            title: "circuit".to_string(),
        }
    }
}

/// Flatten `circuit` into a netlist with canonical node numbering.
///
/// `pool` must hold every sub-block the circuit (transitively) embeds; it may
/// be `None` for flat circuits.
pub fn flatten(
    circuit: &Circuit,
    pool: Option<&CircuitArena>,
    options: &FlattenOptions,
) -> NetlistResult<Netlist> {
    let mut flattener = Flattener::new(pool, options);

    let mut node_map = vec![0; circuit.nodes().len()];
    for node in circuit.nodes() {
        if node.id != circuit.reference() {
            node_map[node.id.idx()] = flattener.fresh_node();
        }
    }
    let scope = flattener.open_scope();
    flattener.emit_circuit(circuit, &node_map, scope, None)?;
    flattener.resolve_controls()?;

    let input = flattener.input.take().ok_or(NetlistError::MissingSource)?;
    let output = flattener
        .output
        .take()
        .ok_or_else(|| NetlistError::MissingPort {
            name: options.title.clone(),
            port: cs_graph::OUTPUT_PORT,
        })?;

    let analysis = if options.rlc || flattener.elements.iter().any(|e| e.kind.is_reactive()) {
        Analysis::Ac
    } else {
        Analysis::Dc
    };

    let netlist = Netlist {
        title: options.title.clone(),
        analysis,
        symbolic: options.symbolic,
        node_count: flattener.next_node,
        elements: flattener.elements,
        probes: flattener.probes,
        input,
        output,
    };
    debug!(
        elements = netlist.elements.len(),
        nodes = netlist.node_count,
        level = circuit.level(),
        "flattened"
    );
    Ok(netlist.canonicalize())
}

/// What a controlled source may read from a probed element.
#[derive(Debug, Clone)]
struct Sense {
    voltage: (u32, u32),
    ammeter: Option<String>,
}

struct Pending {
    index: usize,
    scope: usize,
    owner: ElemId,
    measure: Measure,
}

struct Flattener<'a> {
    pool: Option<&'a CircuitArena>,
    options: &'a FlattenOptions,
    next_node: u32,
    scopes: usize,
    counters: HashMap<&'static str, u32>,
    elements: Vec<NetElement>,
    probes: Vec<NetProbe>,
    senses: HashMap<(usize, ElemId), Sense>,
    pending: Vec<Pending>,
    input: Option<String>,
    output: Option<OutputRef>,
}

impl<'a> Flattener<'a> {
    fn new(pool: Option<&'a CircuitArena>, options: &'a FlattenOptions) -> Self {
        Self {
            pool,
            options,
            next_node: 1,
            scopes: 0,
            counters: HashMap::new(),
            elements: Vec::new(),
            probes: Vec::new(),
            senses: HashMap::new(),
            pending: Vec::new(),
            input: None,
            output: None,
        }
    }

    fn fresh_node(&mut self) -> u32 {
        let node = self.next_node;
        self.next_node += 1;
        node
    }

    fn open_scope(&mut self) -> usize {
        let scope = self.scopes;
        self.scopes += 1;
        scope
    }

    fn next_label(&mut self, prefix: &'static str) -> u32 {
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter += 1;
        *counter
    }

    fn value(&self, value: i64) -> Option<i64> {
        (!self.options.symbolic).then_some(value)
    }

    fn push(&mut self, name: String, kind: NetKind, pos: u32, neg: u32, value: i64) -> usize {
        let value = self.value(value);
        self.elements.push(NetElement {
            symbol: name.clone(),
            name,
            kind,
            pos,
            neg,
            control: None,
            value,
        });
        self.elements.len() - 1
    }

    fn push_ammeter(&mut self, pos: u32, neg: u32) -> String {
        let name = format!("VI{}", self.next_label("VI"));
        self.elements.push(NetElement {
            name: name.clone(),
            kind: NetKind::Ammeter,
            pos,
            neg,
            control: None,
            value: Some(0),
            symbol: name.clone(),
        });
        name
    }

    /// Emit every element of `circuit` with its nodes translated by `node_map`.
    ///
    /// `dropped` is the driving source of a sub-block, replaced by the parent.
    fn emit_circuit(
        &mut self,
        circuit: &Circuit,
        node_map: &[u32],
        scope: usize,
        dropped: Option<ElemId>,
    ) -> NetlistResult<()> {
        let top = scope == 0;
        let ground = node_map[circuit.reference().idx()];
        for elem in circuit.elements() {
            if Some(elem.id) == dropped {
                continue;
            }
            let (p, n) = circuit
                .element_nodes(elem.id)
                .ok_or(GraphError::IdNotFound {
                    what: "element terminals",
                })?;
            let (pos, neg) = (node_map[p.idx()], node_map[n.idx()]);
            let name = match &elem.part {
                Part::Block(block) => {
                    self.emit_block(block, pos, neg)?;
                    elem.part.name()
                }
                Part::Device(spec) => self.emit_device(scope, elem, spec, pos, neg, ground)?,
            };
            if top && self.output.is_none() && !elem.kind().is_independent_source() {
                self.output = Some(OutputRef {
                    label: name,
                    pos,
                    neg,
                });
            }
        }
        Ok(())
    }

    fn emit_block(&mut self, block: &BlockRef, pos: u32, neg: u32) -> NetlistResult<()> {
        let pool = self.pool.ok_or(NetlistError::NoPool)?;
        let child = pool.require(block.circuit)?;
        let block_name = format!("B{}", block.label);
        let port = child
            .port(INPUT_PORT)
            .filter(|port| port.pos != port.neg)
            .ok_or_else(|| NetlistError::MissingPort {
                name: block_name.clone(),
                port: INPUT_PORT,
            })?;
        let source = child.elements().iter().find(|e| {
            e.kind() == ElementKind::VoltageSource
                && child.element_nodes(e.id) == Some((port.pos, port.neg))
        });

        let scope = self.open_scope();
        let mut node_map: Vec<Option<u32>> = vec![None; child.nodes().len()];
        node_map[port.neg.idx()] = Some(neg);
        node_map[port.pos.idx()] = Some(pos);

        if let Some(source) = source {
            let probe = source.part.spec().map(|s| s.probe).unwrap_or_default();
            let mut sense = Sense {
                voltage: if probe.same_direction { (pos, neg) } else { (neg, pos) },
                ammeter: None,
            };
            if probe.measure == Measure::Current {
                let inner = self.fresh_node();
                let ammeter = if probe.same_direction {
                    self.push_ammeter(inner, pos)
                } else {
                    self.push_ammeter(pos, inner)
                };
                node_map[port.pos.idx()] = Some(inner);
                sense.ammeter = Some(ammeter);
            }
            self.senses.insert((scope, source.id), sense);
        }

        let mut mapped = Vec::with_capacity(node_map.len());
        for slot in node_map {
            let node = match slot {
                Some(node) => node,
                None => self.fresh_node(),
            };
            mapped.push(node);
        }
        debug!(block = %block_name, circuit = %block.circuit, level = block.level, "expanding sub-block");
        self.emit_circuit(&child, &mapped, scope, source.map(|s| s.id))
    }

    /// Emit one device and return the name its output is reported under.
    fn emit_device(
        &mut self,
        scope: usize,
        elem: &Element,
        spec: &ComponentSpec,
        pos: u32,
        neg: u32,
        ground: u32,
    ) -> NetlistResult<String> {
        let probe = spec.probe;
        let mut sense = Sense {
            voltage: if probe.same_direction { (pos, neg) } else { (neg, pos) },
            ammeter: None,
        };

        let name = if spec.kind == ElementKind::Short {
            let ammeter = if probe.same_direction {
                self.push_ammeter(pos, neg)
            } else {
                self.push_ammeter(neg, pos)
            };
            sense.ammeter = Some(ammeter.clone());
            ammeter
        } else {
            let mut body_neg = neg;
            if probe.measure == Measure::Current {
                let mid = self.fresh_node();
                let ammeter = if probe.same_direction {
                    self.push_ammeter(mid, neg)
                } else {
                    self.push_ammeter(neg, mid)
                };
                sense.ammeter = Some(ammeter);
                body_neg = mid;
            }
            self.emit_body(scope, elem, spec, pos, body_neg, ground)?
        };

        if scope == 0
            && probe.is_visible()
            && let Some(label) = probe.label
        {
            let target = match (probe.measure, &sense.ammeter) {
                (Measure::Current, Some(ammeter)) => ProbeTarget::Current {
                    ammeter: ammeter.clone(),
                },
                _ => ProbeTarget::Voltage {
                    pos: sense.voltage.0,
                    neg: sense.voltage.1,
                },
            };
            self.probes.push(NetProbe { label, target });
        }
        self.senses.insert((scope, elem.id), sense);
        Ok(name)
    }

    fn emit_body(
        &mut self,
        scope: usize,
        elem: &Element,
        spec: &ComponentSpec,
        pos: u32,
        neg: u32,
        ground: u32,
    ) -> NetlistResult<String> {
        let value = i64::from(spec.value);
        let simple = |kind: ElementKind| -> Option<(char, NetKind)> {
            match kind {
                ElementKind::VoltageSource => Some(('V', NetKind::VoltageSource)),
                ElementKind::CurrentSource => Some(('I', NetKind::CurrentSource)),
                ElementKind::Resistor => Some(('R', NetKind::Resistor)),
                ElementKind::Capacitor => Some(('C', NetKind::Capacitor)),
                ElementKind::Inductor => Some(('L', NetKind::Inductor)),
                _ => None,
            }
        };

        if let Some((letter, kind)) = simple(spec.kind) {
            let name = format!("{letter}{}", self.next_label(letter_key(letter)));
            self.push(name.clone(), kind, pos, neg, value);
            if kind == NetKind::VoltageSource && scope == 0 {
                self.input = Some(name.clone());
            }
            return Ok(name);
        }

        match spec.kind {
            ElementKind::Vccs | ElementKind::Vcvs | ElementKind::Cccs | ElementKind::Ccvs => {
                self.emit_controlled(scope, elem, spec, pos, neg)
            }
            ElementKind::OpAmpIntegrator => {
                let k = self.next_label("int");
                let inv = self.fresh_node();
                self.push(format!("Rint{k}"), NetKind::Resistor, pos, inv, value);
                self.push(format!("Cint{k}"), NetKind::Capacitor, neg, inv, value);
                Ok(self.push_opamp(format!("Eint{k}"), neg, ground, ground, inv))
            }
            ElementKind::OpAmpInverting | ElementKind::OpAmpSumming => {
                let k = self.next_label("op");
                let inv = self.fresh_node();
                self.push(format!("Rin{k}"), NetKind::Resistor, pos, inv, 1);
                self.push(format!("Rf{k}"), NetKind::Resistor, neg, inv, value);
                Ok(self.push_opamp(format!("Eop{k}"), neg, ground, ground, inv))
            }
            ElementKind::OpAmpNonInverting => {
                let k = self.next_label("op");
                let inv = self.fresh_node();
                self.push(format!("Rf{k}"), NetKind::Resistor, neg, inv, value);
                self.push(format!("Rg{k}"), NetKind::Resistor, inv, ground, 1);
                Ok(self.push_opamp(format!("Eop{k}"), neg, ground, pos, inv))
            }
            ElementKind::OpAmpBuffer => {
                let k = self.next_label("op");
                Ok(self.push_opamp(format!("Eop{k}"), neg, ground, pos, neg))
            }
            ElementKind::OpAmpDifferentiator => {
                let k = self.next_label("op");
                let inv = self.fresh_node();
                self.push(format!("Cd{k}"), NetKind::Capacitor, pos, inv, value);
                self.push(format!("Rf{k}"), NetKind::Resistor, neg, inv, value);
                Ok(self.push_opamp(format!("Eop{k}"), neg, ground, ground, inv))
            }
            other => Err(NetlistError::Unsupported {
                kind: other.describe(),
            }),
        }
    }

    fn emit_controlled(
        &mut self,
        scope: usize,
        elem: &Element,
        spec: &ComponentSpec,
        pos: u32,
        neg: u32,
    ) -> NetlistResult<String> {
        let (letter, kind) = match spec.kind {
            ElementKind::Vccs => ('G', NetKind::Vccs),
            ElementKind::Vcvs => ('E', NetKind::Vcvs),
            ElementKind::Cccs => ('F', NetKind::Cccs),
            _ => ('H', NetKind::Ccvs),
        };
        let name = format!("{letter}{}", self.next_label(letter_key(letter)));
        let (Some(owner), Some(measure)) = (elem.control, spec.kind.controller_measure()) else {
            return Err(NetlistError::UnresolvedControl { name });
        };
        let gain_prefix = spec.kind.symbol_prefix();
        let gain_key = if gain_prefix == "x_" { "x_" } else { "y_" };
        let symbol = format!("{gain_prefix}{}", self.next_label(gain_key));

        let index = self.push(name.clone(), kind, pos, neg, i64::from(spec.value));
        self.elements[index].symbol = symbol;
        self.pending.push(Pending {
            index,
            scope,
            owner,
            measure,
        });
        Ok(name)
    }

    /// Ideal op-amp driving `out` against `ground` from `v(noninv) - v(inv)`.
    fn push_opamp(&mut self, name: String, out: u32, ground: u32, noninv: u32, inv: u32) -> String {
        let index = self.push(name.clone(), NetKind::OpAmp, out, ground, OPAMP_GAIN_VALUE);
        let element = &mut self.elements[index];
        element.symbol = OPAMP_GAIN.to_string();
        element.control = Some(NetControl::Nodes {
            pos: noninv,
            neg: inv,
        });
        name
    }

    fn resolve_controls(&mut self) -> NetlistResult<()> {
        for pending in std::mem::take(&mut self.pending) {
            let name = self.elements[pending.index].name.clone();
            let sense = self
                .senses
                .get(&(pending.scope, pending.owner))
                .ok_or_else(|| NetlistError::UnresolvedControl { name: name.clone() })?;
            let control = match pending.measure {
                Measure::Current => NetControl::Branch {
                    ammeter: sense
                        .ammeter
                        .clone()
                        .ok_or(NetlistError::UnresolvedControl { name })?,
                },
                _ => NetControl::Nodes {
                    pos: sense.voltage.0,
                    neg: sense.voltage.1,
                },
            };
            self.elements[pending.index].control = Some(control);
        }
        Ok(())
    }
}

fn letter_key(letter: char) -> &'static str {
    match letter {
        'V' => "V",
        'I' => "I",
        'R' => "R",
        'C' => "C",
        'L' => "L",
        'G' => "G",
        'E' => "E",
        'F' => "F",
        _ => "H",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_components::Probe;
    use cs_graph::{CircuitBuilder, OUTPUT_PORT};

    fn device(kind: ElementKind, label: u32, value: u32) -> Part {
        Part::Device(ComponentSpec::new(kind, label, value))
    }

    /// V1 driving R1 in series with R2 to ground.
    fn divider(probe: Probe) -> Circuit {
        let mut b = CircuitBuilder::new();
        let gnd = b.add_node("0");
        let top = b.add_node("1");
        let mid = b.add_node("2");
        b.add_element(device(ElementKind::VoltageSource, 1, 5), top, gnd);
        b.add_element(
            Part::Device(ComponentSpec::new(ElementKind::Resistor, 1, 10).with_probe(probe)),
            top,
            mid,
        );
        b.add_element(device(ElementKind::Resistor, 2, 20), mid, gnd);
        b.set_reference(gnd);
        b.add_port(INPUT_PORT, top, gnd);
        b.add_port(OUTPUT_PORT, top, mid);
        b.build().unwrap()
    }

    #[test]
    fn flat_circuit_keeps_names_and_nodes() {
        let n = flatten(&divider(Probe::none()), None, &FlattenOptions::default()).unwrap();
        let names: Vec<_> = n.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["V1", "R1", "R2"]);
        assert_eq!(n.node_count, 3);
        assert_eq!(n.analysis, Analysis::Dc);
        assert_eq!(n.input, "V1");
        assert_eq!(n.output.label, "R1");
        assert!(n.elements.iter().all(|e| e.value.is_none()));
    }

    #[test]
    fn current_probe_inserts_ammeter() {
        let n = flatten(&divider(Probe::current(3)), None, &FlattenOptions::default()).unwrap();
        assert_eq!(n.count(NetKind::Ammeter), 1);
        assert_eq!(n.component_count(), 3);
        assert_eq!(
            n.probes,
            vec![NetProbe {
                label: 3,
                target: ProbeTarget::Current {
                    ammeter: "VI1".into()
                }
            }]
        );
        let r1 = n.element("R1").unwrap();
        let vi = n.element("VI1").unwrap();
        assert_eq!(r1.neg, vi.pos);
    }

    #[test]
    fn numeric_mode_writes_values() {
        let options = FlattenOptions {
            symbolic: false,
            ..FlattenOptions::default()
        };
        let n = flatten(&divider(Probe::none()), None, &options).unwrap();
        assert_eq!(n.element("R2").unwrap().value, Some(20));
    }

    #[test]
    fn integrator_expands_around_ideal_opamp() {
        let mut b = CircuitBuilder::new();
        let gnd = b.add_node("0");
        let a = b.add_node("1");
        let c = b.add_node("2");
        b.add_element(device(ElementKind::VoltageSource, 1, 5), a, gnd);
        b.add_element(device(ElementKind::OpAmpIntegrator, 1, 3), a, c);
        b.add_element(device(ElementKind::Resistor, 1, 10), c, gnd);
        b.set_reference(gnd);
        let n = flatten(&b.build().unwrap(), None, &FlattenOptions::default()).unwrap();

        assert_eq!(n.analysis, Analysis::Ac);
        assert_eq!(n.count(NetKind::OpAmp), 1);
        let e = n.element("Eint1").unwrap();
        assert_eq!(e.neg, 0);
        assert_eq!(e.symbol, OPAMP_GAIN);
        let rint = n.element("Rint1").unwrap();
        assert_eq!(
            e.control,
            Some(NetControl::Nodes {
                pos: 0,
                neg: rint.neg
            })
        );
        assert_eq!(n.output.label, "Eint1");
    }

    #[test]
    fn bjt_is_unsupported() {
        let mut b = CircuitBuilder::new();
        let gnd = b.add_node("0");
        let a = b.add_node("1");
        b.add_element(device(ElementKind::VoltageSource, 1, 5), a, gnd);
        b.add_element(device(ElementKind::BjtSmallSignal, 1, 50), a, gnd);
        b.set_reference(gnd);
        assert!(matches!(
            flatten(&b.build().unwrap(), None, &FlattenOptions::default()),
            Err(NetlistError::Unsupported { .. })
        ));
    }

    #[test]
    fn sub_block_replaces_source_with_parent_wiring() {
        let arena = CircuitArena::new();
        let child = arena.insert(divider(Probe::none())).unwrap();

        let mut b = CircuitBuilder::new();
        let gnd = b.add_node("0");
        let top = b.add_node("1");
        b.add_element(device(ElementKind::VoltageSource, 1, 5), top, gnd);
        b.add_element(
            Part::Block(BlockRef {
                circuit: child,
                level: 0,
                label: 1,
            }),
            top,
            gnd,
        );
        b.set_reference(gnd);
        b.set_level(1);
        let parent = b.build().unwrap();

        assert_eq!(
            flatten(&parent, None, &FlattenOptions::default()),
            Err(NetlistError::NoPool)
        );
        let n = flatten(&parent, Some(&arena), &FlattenOptions::default()).unwrap();
        let names: Vec<_> = n.elements.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["V1", "R1", "R2"]);
        assert_eq!(n.node_count, 3);
        assert_eq!(n.output.label, "B1");
        let r2 = n.element("R2").unwrap();
        assert_eq!(r2.neg, 0);
    }
}
