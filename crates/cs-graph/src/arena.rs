//! Append-only arena of validated circuits.
//!
//! Circuits are stored behind `Arc` and never mutated once inserted, so any
//! number of compositions may read the same sub-block concurrently while
//! lower levels keep appending. A circuit may only reference arena entries of
//! a strictly lower level, which rules out cycles at insertion time.

use std::sync::{Arc, PoisonError, RwLock};

use cs_core::CircuitId;

use crate::error::{GraphError, GraphResult};
use crate::graph::Circuit;

/// Highest hierarchy level (six levels: 0..=5).
pub const MAX_LEVEL: u8 = 5;

#[derive(Debug, Default)]
pub struct CircuitArena {
    circuits: RwLock<Vec<Arc<Circuit>>>,
}

impl CircuitArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a circuit, returning its id.
    ///
    /// Fails when the circuit embeds an unknown id or a block that is not
    /// strictly below its own level.
    pub fn insert(&self, circuit: Circuit) -> GraphResult<CircuitId> {
        let mut guard = self
            .circuits
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if circuit.level() > MAX_LEVEL {
            return Err(GraphError::LevelOutOfRange {
                level: circuit.level(),
                max: MAX_LEVEL,
            });
        }
        for (_, block) in circuit.sub_blocks() {
            let child = guard
                .get(block.circuit.idx())
                .ok_or(GraphError::UnknownCircuit { id: block.circuit })?;
            if child.level() != block.level || block.level >= circuit.level() {
                return Err(GraphError::LevelOrder {
                    parent_level: circuit.level(),
                    child: block.circuit,
                    child_level: child.level(),
                });
            }
        }
        let id = CircuitId::from_index(guard.len() as u32);
        guard.push(Arc::new(circuit));
        Ok(id)
    }

    pub fn get(&self, id: CircuitId) -> Option<Arc<Circuit>> {
        self.read().get(id.idx()).cloned()
    }

    pub fn require(&self, id: CircuitId) -> GraphResult<Arc<Circuit>> {
        self.get(id).ok_or(GraphError::UnknownCircuit { id })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of every circuit at exactly `level`, in insertion order.
    pub fn ids_at_level(&self, level: u8) -> Vec<CircuitId> {
        self.ids_where(|c| c.level() == level)
    }

    /// Ids of every circuit strictly below `level`.
    pub fn ids_below(&self, level: u8) -> Vec<CircuitId> {
        self.ids_where(|c| c.level() < level)
    }

    pub fn count_at_level(&self, level: u8) -> usize {
        self.read().iter().filter(|c| c.level() == level).count()
    }

    fn ids_where(&self, pred: impl Fn(&Circuit) -> bool) -> Vec<CircuitId> {
        self.read()
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(c))
            .map(|(i, _)| CircuitId::from_index(i as u32))
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Circuit>>> {
        self.circuits.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CircuitBuilder;
    use crate::graph::{BlockRef, Part};
    use cs_components::{ComponentSpec, ElementKind};

    fn leaf() -> Circuit {
        let mut b = CircuitBuilder::new();
        let n0 = b.add_node("0");
        let n1 = b.add_node("1");
        b.add_element(
            Part::Device(ComponentSpec::new(ElementKind::Resistor, 1, 5)),
            n1,
            n0,
        );
        b.set_reference(n0);
        b.add_port("in", n1, n0);
        b.build().unwrap()
    }

    fn parent(level: u8, child: CircuitId, child_level: u8) -> Circuit {
        let mut b = CircuitBuilder::new();
        let n0 = b.add_node("0");
        let n1 = b.add_node("1");
        b.add_element(
            Part::Block(BlockRef {
                circuit: child,
                level: child_level,
                label: 1,
            }),
            n1,
            n0,
        );
        b.set_reference(n0);
        b.set_level(level);
        b.build().unwrap()
    }

    #[test]
    fn insert_and_query_levels() {
        let arena = CircuitArena::new();
        let a = arena.insert(leaf()).unwrap();
        let b = arena.insert(parent(1, a, 0)).unwrap();
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.ids_at_level(0), vec![a]);
        assert_eq!(arena.ids_below(2), vec![a, b]);
        assert_eq!(arena.count_at_level(1), 1);
    }

    #[test]
    fn same_level_embedding_rejected() {
        let arena = CircuitArena::new();
        let a = arena.insert(leaf()).unwrap();
        let err = arena.insert(parent(0, a, 0)).unwrap_err();
        assert!(matches!(err, GraphError::LevelOrder { .. }));
    }

    #[test]
    fn unknown_child_rejected() {
        let arena = CircuitArena::new();
        let err = arena
            .insert(parent(1, CircuitId::from_index(9), 0))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownCircuit { .. }));
    }

    #[test]
    fn mislabelled_child_level_rejected() {
        let arena = CircuitArena::new();
        let a = arena.insert(leaf()).unwrap();
        let err = arena.insert(parent(2, a, 1)).unwrap_err();
        assert!(matches!(err, GraphError::LevelOrder { .. }));
    }
}
