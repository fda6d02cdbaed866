//! Placed element specifications.

use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, ComponentResult};
use crate::kind::{ElementKind, Measure};

/// Measurement annotation on an element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Probe {
    pub measure: Measure,
    /// Label shown on the schematic and referenced by controlled sources.
    pub label: Option<u8>,
    /// Probe reads in the element's own reference direction.
    pub same_direction: bool,
    /// Kept in the model but left off rendered output.
    #[serde(default)]
    pub hidden: bool,
}

impl Probe {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn voltage(label: u8) -> Self {
        Self {
            measure: Measure::Voltage,
            label: Some(label),
            same_direction: true,
            hidden: false,
        }
    }

    pub fn current(label: u8) -> Self {
        Self {
            measure: Measure::Current,
            label: Some(label),
            same_direction: true,
            hidden: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.measure != Measure::None
    }

    /// Active and shown on rendered output.
    pub fn is_visible(&self) -> bool {
        self.is_active() && !self.hidden
    }
}

/// One placed element: kind, per-kind ordinal label, integer value, polarity
/// and measurement annotation.
///
/// Specs are values; every `with_*` method returns a new spec.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub kind: ElementKind,
    /// 1-based ordinal within its kind (`R1`, `R2`, ...).
    pub label: u32,
    pub value: u32,
    /// Terminals are swapped relative to the grid's natural order.
    #[serde(default)]
    pub reversed: bool,
    #[serde(default)]
    pub probe: Probe,
    /// Probe label a controlled source reads from.
    #[serde(default)]
    pub control: Option<u8>,
}

impl ComponentSpec {
    pub fn new(kind: ElementKind, label: u32, value: u32) -> Self {
        Self {
            kind,
            label,
            value,
            reversed: false,
            probe: Probe::none(),
            control: None,
        }
    }

    pub fn wire() -> Self {
        Self::new(ElementKind::Short, 0, 0)
    }

    pub fn with_label(mut self, label: u32) -> Self {
        self.label = label;
        self
    }

    pub fn with_kind(mut self, kind: ElementKind, value: u32) -> Self {
        self.kind = kind;
        self.value = value;
        if kind.controller_measure().is_none() {
            self.control = None;
        }
        self
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_control(mut self, label: u8) -> Self {
        self.control = Some(label);
        self
    }

    /// Device name, e.g. `R3`, `G1`. Wires are named `W{label}`.
    pub fn name(&self) -> String {
        match self.kind.spice_prefix() {
            Some(prefix) => format!("{prefix}{}", self.label),
            None => format!("W{}", self.label),
        }
    }

    /// Symbolic parameter carried by the element.
    pub fn symbol(&self) -> String {
        match self.kind {
            ElementKind::Vccs | ElementKind::Vcvs | ElementKind::Cccs | ElementKind::Ccvs => {
                format!("{}{}", self.kind.symbol_prefix(), self.label)
            }
            _ => self.name(),
        }
    }

    /// Rejects a probe the element's own behaviour makes meaningless.
    pub fn check_probe(&self) -> ComponentResult<()> {
        if self.kind.conflicts_with(self.probe.measure) {
            return Err(ComponentError::ProbeConflict {
                kind: self.kind.describe(),
                measure: self.probe.measure.describe(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_symbols() {
        let c = ComponentSpec::new(ElementKind::Capacitor, 4, 10);
        assert_eq!(c.name(), "C4");
        assert_eq!(c.symbol(), "C4");

        let e = ComponentSpec::new(ElementKind::Ccvs, 2, 5).with_control(1);
        assert_eq!(e.name(), "H2");
        assert_eq!(e.symbol(), "x_2");

        assert_eq!(ComponentSpec::wire().with_label(3).name(), "W3");
    }

    #[test]
    fn changing_kind_drops_stale_control() {
        let g = ComponentSpec::new(ElementKind::Vccs, 1, 5).with_control(2);
        let r = g.with_kind(ElementKind::Resistor, 12);
        assert_eq!(r.control, None);
        assert_eq!(r.value, 12);
    }

    #[test]
    fn probe_check() {
        let v = ComponentSpec::new(ElementKind::VoltageSource, 1, 5).with_probe(Probe::voltage(0));
        assert!(v.check_probe().is_err());
        let v = v.with_probe(Probe::current(0));
        assert!(v.check_probe().is_ok());
    }
}
