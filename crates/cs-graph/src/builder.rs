//! Incremental circuit builder.

use std::collections::HashMap;

use cs_core::{ElemId, NodeId, TermId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Circuit, Element, Node, Part, Placement, Port, Terminal, TerminalKind};
use crate::validate;

/// Builder for constructing a circuit incrementally.
///
/// Use `add_node` and `add_element` to build up the circuit, designate a
/// reference node, then call `build()` to validate and freeze it.
#[derive(Debug, Default)]
pub struct CircuitBuilder {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    terminals: Vec<Terminal>,
    reference: Option<NodeId>,
    ports: Vec<Port>,
    level: u8,
    grid: Option<(u32, u32)>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its ID.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name: name.into(),
        });
        id
    }

    /// Add an element between `pos` and `neg`.
    ///
    /// Creates both terminals and attaches them to the nodes.
    pub fn add_element(&mut self, part: Part, pos: NodeId, neg: NodeId) -> ElemId {
        let elem_id = ElemId::from_index(self.elements.len() as u32);

        let pos_term = TermId::from_index(self.terminals.len() as u32);
        self.terminals.push(Terminal {
            id: pos_term,
            elem: elem_id,
            node: pos,
            kind: TerminalKind::Pos,
        });

        let neg_term = TermId::from_index(self.terminals.len() as u32);
        self.terminals.push(Terminal {
            id: neg_term,
            elem: elem_id,
            node: neg,
            kind: TerminalKind::Neg,
        });

        self.elements.push(Element {
            id: elem_id,
            part,
            terminals: [pos_term, neg_term],
            control: None,
            placement: None,
        });

        elem_id
    }

    pub fn set_control(&mut self, elem: ElemId, control: ElemId) {
        if let Some(e) = self.elements.get_mut(elem.idx()) {
            e.control = Some(control);
        }
    }

    pub fn set_placement(&mut self, elem: ElemId, placement: Placement) {
        if let Some(e) = self.elements.get_mut(elem.idx()) {
            e.placement = Some(placement);
        }
    }

    pub fn set_reference(&mut self, node: NodeId) {
        self.reference = Some(node);
    }

    pub fn add_port(&mut self, name: impl Into<String>, pos: NodeId, neg: NodeId) {
        self.ports.push(Port {
            name: name.into(),
            pos,
            neg,
        });
    }

    pub fn set_level(&mut self, level: u8) {
        self.level = level;
    }

    pub fn set_grid(&mut self, rows: u32, cols: u32) {
        self.grid = Some((rows, cols));
    }

    pub fn rename_node(&mut self, node_id: NodeId, new_name: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(node_id.idx()) {
            node.name = new_name.into();
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Validate and freeze into an immutable `Circuit`.
    pub fn build(self) -> GraphResult<Circuit> {
        validate::validate_structure(&self.nodes, &self.elements, &self.terminals)?;

        let reference = self.reference.ok_or(GraphError::MissingReference)?;
        if reference.idx() >= self.nodes.len() {
            return Err(GraphError::IdNotFound {
                what: "reference node",
            });
        }
        validate::validate_ports(&self.nodes, &self.ports)?;
        validate::validate_controls(&self.elements)?;

        let (node_term_offsets, node_terms) = Self::build_adjacency(&self.nodes, &self.terminals);
        validate::validate_adjacency(
            &self.nodes,
            &self.terminals,
            &node_term_offsets,
            &node_terms,
        )?;

        Ok(Circuit {
            nodes: self.nodes,
            elements: self.elements,
            terminals: self.terminals,
            node_term_offsets,
            node_terms,
            reference,
            ports: self.ports,
            level: self.level,
            grid: self.grid,
        })
    }

    fn build_adjacency(nodes: &[Node], terminals: &[Terminal]) -> (Vec<usize>, Vec<TermId>) {
        let mut node_to_terms: HashMap<NodeId, Vec<TermId>> = HashMap::new();
        for term in terminals {
            node_to_terms.entry(term.node).or_default().push(term.id);
        }

        for list in node_to_terms.values_mut() {
            list.sort_by_key(|t| t.index());
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut flat = Vec::new();
        offsets.push(0);

        for node in nodes {
            if let Some(list) = node_to_terms.get(&node.id) {
                flat.extend_from_slice(list);
            }
            offsets.push(flat.len());
        }

        (offsets, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_components::{ComponentSpec, ElementKind};

    fn resistor(label: u32) -> Part {
        Part::Device(ComponentSpec::new(ElementKind::Resistor, label, 10))
    }

    #[test]
    fn builder_basic() {
        let mut builder = CircuitBuilder::new();
        let n1 = builder.add_node("n1");
        let n2 = builder.add_node("n2");
        let r1 = builder.add_element(resistor(1), n1, n2);

        assert_eq!(n1.index(), 0);
        assert_eq!(n2.index(), 1);
        assert_eq!(r1.index(), 0);
        assert_eq!(builder.nodes.len(), 2);
        assert_eq!(builder.elements.len(), 1);
        assert_eq!(builder.terminals.len(), 2);
    }

    #[test]
    fn build_requires_reference() {
        let mut builder = CircuitBuilder::new();
        let n1 = builder.add_node("n1");
        let n2 = builder.add_node("n2");
        builder.add_element(resistor(1), n1, n2);
        assert_eq!(builder.build().unwrap_err(), GraphError::MissingReference);
    }

    #[test]
    fn builder_build_simple() {
        let mut builder = CircuitBuilder::new();
        let n1 = builder.add_node("n1");
        let n2 = builder.add_node("n2");
        builder.add_element(resistor(1), n1, n2);
        builder.set_reference(n2);

        let circuit = builder.build().unwrap();
        assert_eq!(circuit.nodes().len(), 2);
        assert_eq!(circuit.elements().len(), 1);
        assert_eq!(circuit.degree(n1), 1);
        assert_eq!(circuit.degree(n2), 1);
        assert_eq!(circuit.reference(), n2);
    }

    #[test]
    fn control_must_start_at_controlled_source() {
        let mut builder = CircuitBuilder::new();
        let n1 = builder.add_node("n1");
        let n2 = builder.add_node("n2");
        let r1 = builder.add_element(resistor(1), n1, n2);
        let r2 = builder.add_element(resistor(2), n1, n2);
        builder.set_control(r1, r2);
        builder.set_reference(n2);
        assert!(matches!(
            builder.build(),
            Err(GraphError::InvalidControl { .. })
        ));
    }
}
