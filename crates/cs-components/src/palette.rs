//! Weighted placement distributions.
//!
//! Sampling itself lives with the generator; tables here only map a ticket
//! in `0..total()` onto a kind, which keeps the catalog free of RNG state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ComponentError, ComponentResult};
use crate::kind::ElementKind;

/// Relative weights per element kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightTable {
    weights: BTreeMap<ElementKind, u32>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ElementKind, weight: u32) -> Self {
        self.set(kind, weight);
        self
    }

    pub fn set(&mut self, kind: ElementKind, weight: u32) {
        if weight == 0 {
            self.weights.remove(&kind);
        } else {
            self.weights.insert(kind, weight);
        }
    }

    pub fn weight(&self, kind: ElementKind) -> u32 {
        self.weights.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.weights.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Kind owning `ticket` in the cumulative distribution.
    pub fn pick(&self, ticket: u32) -> Option<ElementKind> {
        let mut acc = 0_u32;
        for (&kind, &w) in &self.weights {
            acc += w;
            if ticket < acc {
                return Some(kind);
            }
        }
        None
    }

    pub fn kinds(&self) -> impl Iterator<Item = ElementKind> + '_ {
        self.weights.keys().copied()
    }
}

/// Inner and outer edge distributions.
///
/// Outer edges (the grid's boundary) use their own table so the perimeter
/// stays mostly closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub inner: WeightTable,
    pub outer: WeightTable,
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

impl Palette {
    pub fn standard() -> Self {
        use ElementKind::*;
        let inner = WeightTable::new()
            .with(Short, 12)
            .with(VoltageSource, 4)
            .with(Resistor, 15)
            .with(Capacitor, 6)
            .with(Inductor, 5)
            .with(Open, 8)
            .with(Vccs, 1)
            .with(Vcvs, 4)
            .with(Cccs, 3)
            .with(Ccvs, 4);
        let outer = WeightTable::new()
            .with(Short, 10)
            .with(VoltageSource, 4)
            .with(Resistor, 10)
            .with(Capacitor, 1)
            .with(Inductor, 1)
            .with(Vccs, 3)
            .with(Vcvs, 3)
            .with(Cccs, 2)
            .with(Ccvs, 1);
        Self { inner, outer }
    }

    /// Passive-only palette: sources, wires and R/C/L.
    pub fn passive() -> Self {
        use ElementKind::*;
        let table = |open: u32| {
            WeightTable::new()
                .with(Short, 10)
                .with(VoltageSource, 3)
                .with(Resistor, 12)
                .with(Capacitor, 3)
                .with(Inductor, 3)
                .with(Open, open)
        };
        Self {
            inner: table(6),
            outer: table(0),
        }
    }

    pub fn table(&self, outer: bool) -> &WeightTable {
        if outer { &self.outer } else { &self.inner }
    }

    pub fn allows(&self, kind: ElementKind) -> bool {
        self.inner.weight(kind) > 0 || self.outer.weight(kind) > 0
    }

    pub fn allows_dependent_sources(&self) -> bool {
        ElementKind::ALL
            .iter()
            .any(|k| k.is_dependent_source() && self.allows(*k))
    }

    pub fn allows_reactive(&self) -> bool {
        self.allows(ElementKind::Capacitor) || self.allows(ElementKind::Inductor)
    }

    /// Both tables must be non-empty and contain only placeable kinds.
    pub fn validate(&self) -> ComponentResult<()> {
        for (what, table) in [("inner palette", &self.inner), ("outer palette", &self.outer)] {
            if table.is_empty() {
                return Err(ComponentError::EmptyDistribution { what });
            }
            if let Some(kind) = table.kinds().find(|k| !k.is_placeable()) {
                return Err(ComponentError::NotPlaceable {
                    kind: kind.describe(),
                });
            }
        }
        Ok(())
    }
}

/// Weighted grid side lengths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSizes {
    /// `(side, weight)` pairs.
    pub options: Vec<(u32, u32)>,
}

impl GridSizes {
    pub fn standard() -> Self {
        Self {
            options: vec![(2, 6), (3, 8), (4, 2)],
        }
    }

    pub fn simple() -> Self {
        Self {
            options: vec![(2, 8), (3, 6), (4, 1)],
        }
    }

    pub fn total(&self) -> u32 {
        self.options.iter().map(|(_, w)| w).sum()
    }

    pub fn pick(&self, ticket: u32) -> Option<u32> {
        let mut acc = 0_u32;
        for &(side, w) in &self.options {
            acc += w;
            if ticket < acc {
                return Some(side);
            }
        }
        None
    }

    pub fn max_side(&self) -> u32 {
        self.options
            .iter()
            .filter(|(_, w)| *w > 0)
            .map(|(s, _)| *s)
            .max()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> ComponentResult<()> {
        if self.total() == 0 {
            return Err(ComponentError::EmptyDistribution { what: "grid sizes" });
        }
        if self.options.iter().any(|&(side, w)| w > 0 && side < 2) {
            return Err(ComponentError::InvalidArg {
                what: "grid side must be at least 2",
            });
        }
        Ok(())
    }
}
