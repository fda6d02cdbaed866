//! Structural validation run by `CircuitBuilder::build`.
//!
//! These checks guard referential integrity only. Electrical validity
//! (degrees, forced counts, shorted sources) is the generator's concern.

use std::collections::HashSet;

use cs_core::{NodeId, TermId};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Element, Node, Port, Terminal};

/// All references exist and terminals agree with their elements.
pub(crate) fn validate_structure(
    nodes: &[Node],
    elements: &[Element],
    terminals: &[Terminal],
) -> GraphResult<()> {
    for (i, term) in terminals.iter().enumerate() {
        if term.id.idx() != i {
            return Err(GraphError::InconsistentAdjacency {
                term: term.id,
                node: term.node,
            });
        }
        if term.node.idx() >= nodes.len() {
            return Err(GraphError::InvalidNodeRef {
                term: term.id,
                node: term.node,
            });
        }
        if term.elem.idx() >= elements.len() {
            return Err(GraphError::InvalidElemRef {
                term: term.id,
                elem: term.elem,
            });
        }
    }

    for elem in elements {
        if elem.terminals[0] == elem.terminals[1] {
            return Err(GraphError::DuplicateTerminals { elem: elem.id });
        }
        for &term_id in &elem.terminals {
            let term = terminals
                .get(term_id.idx())
                .ok_or(GraphError::InvalidElemRef {
                    term: term_id,
                    elem: elem.id,
                })?;
            if term.elem != elem.id {
                return Err(GraphError::TermElemMismatch {
                    term: term_id,
                    expected: elem.id,
                    actual: term.elem,
                });
            }
        }
    }

    Ok(())
}

pub(crate) fn validate_ports(nodes: &[Node], ports: &[Port]) -> GraphResult<()> {
    for port in ports {
        for node in [port.pos, port.neg] {
            if node.idx() >= nodes.len() {
                return Err(GraphError::InvalidPort {
                    name: port.name.clone(),
                    node,
                });
            }
        }
    }
    Ok(())
}

/// Only controlled sources carry a control link, and it must resolve.
pub(crate) fn validate_controls(elements: &[Element]) -> GraphResult<()> {
    for elem in elements {
        if let Some(control) = elem.control {
            let controlled = elem.kind().is_dependent_source();
            if !controlled || control.idx() >= elements.len() || control == elem.id {
                return Err(GraphError::InvalidControl {
                    elem: elem.id,
                    control,
                });
            }
        }
    }
    Ok(())
}

/// Validate adjacency lists for consistency.
pub(crate) fn validate_adjacency(
    nodes: &[Node],
    terminals: &[Terminal],
    offsets: &[usize],
    node_terms: &[TermId],
) -> GraphResult<()> {
    if offsets.len() != nodes.len() + 1 {
        return Err(GraphError::InconsistentAdjacency {
            term: TermId::from_index(0),
            node: nodes.first().map_or(NodeId::from_index(0), |n| n.id),
        });
    }

    for node in nodes {
        let idx = node.id.idx();
        for &term_id in &node_terms[offsets[idx]..offsets[idx + 1]] {
            match terminals.get(term_id.idx()) {
                Some(term) if term.node == node.id => {}
                _ => {
                    return Err(GraphError::InconsistentAdjacency {
                        term: term_id,
                        node: node.id,
                    });
                }
            }
        }
    }

    // Every terminal appears exactly once.
    let mut seen: HashSet<TermId> = HashSet::new();
    for &term_id in node_terms {
        if !seen.insert(term_id) {
            return Err(GraphError::InconsistentAdjacency {
                term: term_id,
                node: terminals[term_id.idx()].node,
            });
        }
    }
    if let Some(missing) = terminals.iter().find(|t| !seen.contains(&t.id)) {
        return Err(GraphError::InconsistentAdjacency {
            term: missing.id,
            node: missing.node,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Part, TerminalKind};
    use cs_components::{ComponentSpec, ElementKind};
    use cs_core::Id;

    fn node(i: u32) -> Node {
        Node {
            id: Id::from_index(i),
            name: format!("n{i}"),
        }
    }

    #[test]
    fn validate_empty_circuit() {
        assert!(validate_structure(&[], &[], &[]).is_ok());
    }

    #[test]
    fn validate_invalid_node_ref() {
        let nodes = vec![node(0)];
        let terminals = vec![Terminal {
            id: Id::from_index(0),
            elem: Id::from_index(0),
            node: Id::from_index(99),
            kind: TerminalKind::Pos,
        }];
        let result = validate_structure(&nodes, &[], &terminals);
        assert!(matches!(result, Err(GraphError::InvalidNodeRef { .. })));
    }

    #[test]
    fn validate_element_terminal_mismatch() {
        let nodes = vec![node(0), node(1)];
        let terminals = vec![
            Terminal {
                id: Id::from_index(0),
                elem: Id::from_index(0),
                node: Id::from_index(0),
                kind: TerminalKind::Pos,
            },
            Terminal {
                id: Id::from_index(1),
                elem: Id::from_index(1),
                node: Id::from_index(1),
                kind: TerminalKind::Neg,
            },
        ];
        let elements = vec![
            Element {
                id: Id::from_index(0),
                part: Part::Device(ComponentSpec::new(ElementKind::Resistor, 1, 1)),
                terminals: [Id::from_index(0), Id::from_index(1)],
                control: None,
                placement: None,
            },
            Element {
                id: Id::from_index(1),
                part: Part::Device(ComponentSpec::new(ElementKind::Resistor, 2, 1)),
                terminals: [Id::from_index(1), Id::from_index(0)],
                control: None,
                placement: None,
            },
        ];
        assert!(matches!(
            validate_structure(&nodes, &elements, &terminals),
            Err(GraphError::TermElemMismatch { .. })
        ));
    }

    #[test]
    fn port_on_missing_node() {
        let ports = vec![Port {
            name: "in".into(),
            pos: Id::from_index(0),
            neg: Id::from_index(5),
        }];
        assert!(matches!(
            validate_ports(&[node(0)], &ports),
            Err(GraphError::InvalidPort { .. })
        ));
    }
}
