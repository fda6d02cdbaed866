//! Integration tests for cs-graph.

use cs_components::{ComponentSpec, ElementKind, Probe};
use cs_graph::{CircuitArena, CircuitBuilder, INPUT_PORT, Part, TerminalKind};

fn device(kind: ElementKind, label: u32) -> Part {
    Part::Device(ComponentSpec::new(kind, label, 10))
}

#[test]
fn build_voltage_divider() {
    // Build: 0 -[V1]- 1 -[R1]- 2 -[R2]- 0
    let mut builder = CircuitBuilder::new();
    let n0 = builder.add_node("0");
    let n1 = builder.add_node("1");
    let n2 = builder.add_node("2");
    let v1 = builder.add_element(device(ElementKind::VoltageSource, 1), n1, n0);
    let r1 = builder.add_element(device(ElementKind::Resistor, 1), n1, n2);
    builder.add_element(device(ElementKind::Resistor, 2), n2, n0);
    builder.set_reference(n0);
    builder.add_port(INPUT_PORT, n1, n0);

    let circuit = builder.build().unwrap();

    assert_eq!(circuit.nodes().len(), 3);
    assert_eq!(circuit.elements().len(), 3);
    assert_eq!(circuit.terminals().len(), 6);
    for node in circuit.nodes() {
        assert_eq!(circuit.degree(node.id), 2);
    }

    let source = circuit.element(v1).unwrap();
    let pos = circuit.terminal(source.pos()).unwrap();
    assert_eq!(pos.node, n1);
    assert_eq!(pos.kind, TerminalKind::Pos);

    assert_eq!(circuit.element_nodes(r1), Some((n1, n2)));
    assert_eq!(circuit.count(ElementKind::Resistor), 2);
    assert_eq!(circuit.connected_sections(), 1);
    assert!(circuit.is_boundary_node(n1));
    assert!(!circuit.is_boundary_node(n2));
    assert!(circuit.is_flat());
}

#[test]
fn isolated_sections_are_counted() {
    let mut builder = CircuitBuilder::new();
    let a = builder.add_node("a");
    let b = builder.add_node("b");
    let c = builder.add_node("c");
    let d = builder.add_node("d");
    builder.add_element(device(ElementKind::Resistor, 1), a, b);
    builder.add_element(device(ElementKind::Resistor, 2), c, d);
    builder.set_reference(a);
    let circuit = builder.build().unwrap();
    assert_eq!(circuit.connected_sections(), 2);
}

#[test]
fn controlled_source_links_to_probe() {
    let mut builder = CircuitBuilder::new();
    let n0 = builder.add_node("0");
    let n1 = builder.add_node("1");
    let r1 = builder.add_element(
        Part::Device(
            ComponentSpec::new(ElementKind::Resistor, 1, 10).with_probe(Probe::voltage(3)),
        ),
        n1,
        n0,
    );
    let g1 = builder.add_element(
        Part::Device(ComponentSpec::new(ElementKind::Vccs, 1, 2).with_control(3)),
        n1,
        n0,
    );
    builder.set_control(g1, r1);
    builder.set_reference(n0);
    let circuit = builder.build().unwrap();
    assert_eq!(circuit.element(g1).unwrap().control, Some(r1));
}

#[test]
fn arena_shares_circuits() {
    let mut builder = CircuitBuilder::new();
    let n0 = builder.add_node("0");
    let n1 = builder.add_node("1");
    builder.add_element(device(ElementKind::Resistor, 1), n1, n0);
    builder.set_reference(n0);
    let circuit = builder.build().unwrap();

    let arena = CircuitArena::new();
    let id = arena.insert(circuit.clone()).unwrap();
    let first = arena.get(id).unwrap();
    let second = arena.get(id).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(*first, circuit);
}
