//! Flat netlist model.
//!
//! Nodes are dense `u32` indices with `0` as the reference. Element names are
//! unique within a netlist and are what controls and probes refer to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Placeholder written for values in symbolic netlists.
pub const EMPTY_VALUE: &str = "<Empty>";
/// Differential gain symbol of ideal op-amps.
pub const OPAMP_GAIN: &str = "Ad";
/// Open-loop gain written for op-amps in numeric netlists.
pub const OPAMP_GAIN_VALUE: i64 = 100_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    /// Operating point; the source is a constant.
    Dc,
    /// Frequency domain; the source is a step.
    Ac,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetKind {
    VoltageSource,
    CurrentSource,
    Resistor,
    Capacitor,
    Inductor,
    /// Zero-volt source sensing a branch current.
    Ammeter,
    Vccs,
    Vcvs,
    Cccs,
    Ccvs,
    /// Ideal op-amp: output between `pos` and `neg`, inputs in the control.
    OpAmp,
}

impl NetKind {
    pub fn is_reactive(self) -> bool {
        matches!(self, NetKind::Capacitor | NetKind::Inductor)
    }

    pub fn needs_voltage_control(self) -> bool {
        matches!(self, NetKind::Vccs | NetKind::Vcvs | NetKind::OpAmp)
    }

    pub fn needs_current_control(self) -> bool {
        matches!(self, NetKind::Cccs | NetKind::Ccvs)
    }
}

/// What a controlled element reads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetControl {
    /// Voltage `v(pos) - v(neg)`; for op-amps the non-inverting and
    /// inverting inputs.
    Nodes { pos: u32, neg: u32 },
    /// Current through the named ammeter.
    Branch { ammeter: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetElement {
    pub name: String,
    pub kind: NetKind,
    pub pos: u32,
    pub neg: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<NetControl>,
    /// `None` in symbolic netlists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    /// Parameter name the element contributes to symbolic equations.
    pub symbol: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeTarget {
    Voltage { pos: u32, neg: u32 },
    Current { ammeter: String },
}

/// A labelled measurement (`U3`, `I1`) shown on the schematic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetProbe {
    pub label: u8,
    pub target: ProbeTarget,
}

impl NetProbe {
    pub fn name(&self) -> String {
        match self.target {
            ProbeTarget::Voltage { .. } => format!("U{}", self.label),
            ProbeTarget::Current { .. } => format!("I{}", self.label),
        }
    }
}

/// Quantity the transfer function observes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// Flattened element (or top-level sub-block) the output spans.
    pub label: String,
    pub pos: u32,
    pub neg: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netlist {
    pub title: String,
    pub analysis: Analysis,
    pub symbolic: bool,
    /// Number of nodes including the reference.
    pub node_count: u32,
    pub elements: Vec<NetElement>,
    #[serde(default)]
    pub probes: Vec<NetProbe>,
    /// Name of the driving voltage source.
    pub input: String,
    pub output: OutputRef,
}

impl Netlist {
    pub fn element(&self, name: &str) -> Option<&NetElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn source(&self) -> Option<&NetElement> {
        self.element(&self.input)
    }

    pub fn count(&self, kind: NetKind) -> usize {
        self.elements.iter().filter(|e| e.kind == kind).count()
    }

    /// Elements that count against the derivation cap; ammeters are free.
    pub fn component_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| e.kind != NetKind::Ammeter)
            .count()
    }

    /// `n + 2·C + 2·L + 3·op-amps`, over the components counted by
    /// [`Netlist::component_count`].
    pub fn complexity_score(&self) -> usize {
        self.component_count()
            + 2 * self.count(NetKind::Capacitor)
            + 2 * self.count(NetKind::Inductor)
            + 3 * self.count(NetKind::OpAmp)
    }

    /// Renumber nodes densely in order of first appearance, keeping `0`.
    ///
    /// Applying this to its own output changes nothing.
    pub fn canonicalize(&self) -> Netlist {
        let mut map: HashMap<u32, u32> = HashMap::new();
        map.insert(0, 0);
        let mut next = 1;
        let mut visit = |n: u32, map: &mut HashMap<u32, u32>| -> u32 {
            *map.entry(n).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        };

        let mut elements = Vec::with_capacity(self.elements.len());
        for e in &self.elements {
            let pos = visit(e.pos, &mut map);
            let neg = visit(e.neg, &mut map);
            let control = match &e.control {
                Some(NetControl::Nodes { pos, neg }) => Some(NetControl::Nodes {
                    pos: visit(*pos, &mut map),
                    neg: visit(*neg, &mut map),
                }),
                other => other.clone(),
            };
            elements.push(NetElement {
                pos,
                neg,
                control,
                ..e.clone()
            });
        }
        let mut remap = |n: u32| visit(n, &mut map);
        let probes = self
            .probes
            .iter()
            .map(|p| NetProbe {
                label: p.label,
                target: match &p.target {
                    ProbeTarget::Voltage { pos, neg } => ProbeTarget::Voltage {
                        pos: remap(*pos),
                        neg: remap(*neg),
                    },
                    other => other.clone(),
                },
            })
            .collect();
        let output = OutputRef {
            label: self.output.label.clone(),
            pos: remap(self.output.pos),
            neg: remap(self.output.neg),
        };
        Netlist {
            title: self.title.clone(),
            analysis: self.analysis,
            symbolic: self.symbolic,
            node_count: next,
            elements,
            probes,
            input: self.input.clone(),
            output,
        }
    }
}
