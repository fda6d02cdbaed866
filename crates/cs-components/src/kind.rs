//! Element kinds and measurement kinds.

use serde::{Deserialize, Serialize};

/// Every element the generator knows how to place or emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Ideal wire.
    Short,
    VoltageSource,
    CurrentSource,
    Resistor,
    Capacitor,
    Inductor,
    /// Missing edge.
    Open,
    Vccs,
    Vcvs,
    Cccs,
    Ccvs,
    OpAmpInverting,
    OpAmpNonInverting,
    OpAmpBuffer,
    OpAmpIntegrator,
    OpAmpDifferentiator,
    OpAmpSumming,
    BjtSmallSignal,
    MosfetSmallSignal,
    /// Embedded lower-level circuit, wired through its input port.
    SubBlock,
}

impl ElementKind {
    pub const ALL: [ElementKind; 20] = [
        ElementKind::Short,
        ElementKind::VoltageSource,
        ElementKind::CurrentSource,
        ElementKind::Resistor,
        ElementKind::Capacitor,
        ElementKind::Inductor,
        ElementKind::Open,
        ElementKind::Vccs,
        ElementKind::Vcvs,
        ElementKind::Cccs,
        ElementKind::Ccvs,
        ElementKind::OpAmpInverting,
        ElementKind::OpAmpNonInverting,
        ElementKind::OpAmpBuffer,
        ElementKind::OpAmpIntegrator,
        ElementKind::OpAmpDifferentiator,
        ElementKind::OpAmpSumming,
        ElementKind::BjtSmallSignal,
        ElementKind::MosfetSmallSignal,
        ElementKind::SubBlock,
    ];

    /// Human readable name used in errors and logs.
    pub fn describe(self) -> &'static str {
        match self {
            ElementKind::Short => "short",
            ElementKind::VoltageSource => "voltage source",
            ElementKind::CurrentSource => "current source",
            ElementKind::Resistor => "resistor",
            ElementKind::Capacitor => "capacitor",
            ElementKind::Inductor => "inductor",
            ElementKind::Open => "open",
            ElementKind::Vccs => "VCCS",
            ElementKind::Vcvs => "VCVS",
            ElementKind::Cccs => "CCCS",
            ElementKind::Ccvs => "CCVS",
            ElementKind::OpAmpInverting => "inverting op-amp",
            ElementKind::OpAmpNonInverting => "non-inverting op-amp",
            ElementKind::OpAmpBuffer => "buffer op-amp",
            ElementKind::OpAmpIntegrator => "integrator op-amp",
            ElementKind::OpAmpDifferentiator => "differentiator op-amp",
            ElementKind::OpAmpSumming => "summing op-amp",
            ElementKind::BjtSmallSignal => "BJT small-signal block",
            ElementKind::MosfetSmallSignal => "MOSFET small-signal block",
            ElementKind::SubBlock => "sub-block",
        }
    }

    /// SPICE element letter, `None` for kinds that never appear in a netlist line.
    pub fn spice_prefix(self) -> Option<char> {
        match self {
            ElementKind::Short | ElementKind::Open => None,
            ElementKind::VoltageSource => Some('V'),
            ElementKind::CurrentSource => Some('I'),
            ElementKind::Resistor => Some('R'),
            ElementKind::Capacitor => Some('C'),
            ElementKind::Inductor => Some('L'),
            ElementKind::Vccs => Some('G'),
            ElementKind::Vcvs => Some('E'),
            ElementKind::Cccs => Some('F'),
            ElementKind::Ccvs => Some('H'),
            _ => Some('X'),
        }
    }

    /// Number of terminals the element exposes to its surroundings.
    pub fn arity(self) -> usize {
        match self {
            ElementKind::BjtSmallSignal | ElementKind::MosfetSmallSignal => 3,
            _ => 2,
        }
    }

    /// Whether the grid generator may draw this kind for an edge.
    pub fn is_placeable(self) -> bool {
        self.arity() == 2 && self != ElementKind::SubBlock
    }

    pub fn is_independent_source(self) -> bool {
        matches!(self, ElementKind::VoltageSource | ElementKind::CurrentSource)
    }

    pub fn is_dependent_source(self) -> bool {
        matches!(
            self,
            ElementKind::Vccs | ElementKind::Vcvs | ElementKind::Cccs | ElementKind::Ccvs
        )
    }

    pub fn is_reactive(self) -> bool {
        matches!(self, ElementKind::Capacitor | ElementKind::Inductor)
    }

    pub fn is_opamp(self) -> bool {
        matches!(
            self,
            ElementKind::OpAmpInverting
                | ElementKind::OpAmpNonInverting
                | ElementKind::OpAmpBuffer
                | ElementKind::OpAmpIntegrator
                | ElementKind::OpAmpDifferentiator
                | ElementKind::OpAmpSumming
        )
    }

    /// Wires and open edges are topology, not elements.
    pub fn is_wiring(self) -> bool {
        matches!(self, ElementKind::Short | ElementKind::Open)
    }

    /// Probe kind a dependent source reads its controlling quantity from.
    pub fn controller_measure(self) -> Option<Measure> {
        match self {
            ElementKind::Vccs | ElementKind::Vcvs => Some(Measure::Voltage),
            ElementKind::Cccs | ElementKind::Ccvs => Some(Measure::Current),
            _ => None,
        }
    }

    /// Forbidden element/probe pairs: a probe that would read a quantity the
    /// element itself forces, or a quantity that cannot exist.
    pub fn conflicts_with(self, measure: Measure) -> bool {
        match measure {
            Measure::None => false,
            Measure::Voltage => matches!(
                self,
                ElementKind::Short
                    | ElementKind::VoltageSource
                    | ElementKind::Vcvs
                    | ElementKind::Ccvs
            ),
            Measure::Current => matches!(
                self,
                ElementKind::Open
                    | ElementKind::CurrentSource
                    | ElementKind::Vccs
                    | ElementKind::Cccs
            ),
        }
    }

    /// Prefix of the symbolic parameter name.
    ///
    /// Controlled sources use gain symbols (`x_k` for voltage outputs, `y_k`
    /// for current outputs); everything else is named after its device letter.
    pub fn symbol_prefix(self) -> &'static str {
        match self {
            ElementKind::Vcvs | ElementKind::Ccvs => "x_",
            ElementKind::Vccs | ElementKind::Cccs => "y_",
            ElementKind::VoltageSource => "V",
            ElementKind::CurrentSource => "I",
            ElementKind::Resistor => "R",
            ElementKind::Capacitor => "C",
            ElementKind::Inductor => "L",
            ElementKind::BjtSmallSignal => "Q",
            ElementKind::MosfetSmallSignal => "M",
            ElementKind::SubBlock => "B",
            k if k.is_opamp() => "A",
            _ => "",
        }
    }

    /// Half-open integer range values are drawn from.
    pub fn value_range(self) -> (u32, u32) {
        match self {
            ElementKind::OpAmpInverting | ElementKind::OpAmpNonInverting => (1, 50),
            ElementKind::OpAmpBuffer => (1, 2),
            ElementKind::OpAmpIntegrator | ElementKind::OpAmpDifferentiator => (1, 10),
            ElementKind::OpAmpSumming => (1, 50),
            ElementKind::BjtSmallSignal => (10, 100),
            _ => (1, 100),
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Measurement attached to a grid edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    #[default]
    None,
    Voltage,
    Current,
}

impl Measure {
    pub fn describe(self) -> &'static str {
        match self {
            Measure::None => "none",
            Measure::Voltage => "voltage",
            Measure::Current => "current",
        }
    }
}
