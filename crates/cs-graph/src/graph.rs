//! Core circuit data structures.

use cs_components::{ComponentSpec, ElementKind};
use cs_core::{CircuitId, ElemId, NodeId, TermId};
use petgraph::graph::UnGraph;
use serde::{Deserialize, Serialize};

/// Polarity of a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminalKind {
    /// Positive terminal (current enters here in the reference direction).
    Pos,
    /// Negative terminal.
    Neg,
}

/// A connection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
}

/// A terminal connects an element to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub id: TermId,
    pub elem: ElemId,
    pub node: NodeId,
    pub kind: TerminalKind,
}

/// Reference from a parent circuit to an embedded lower-level circuit.
///
/// Parents hold the arena index only; the sub-block's nodes stay private and
/// are reached through its declared input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub circuit: CircuitId,
    pub level: u8,
    /// 1-based ordinal among the parent's sub-blocks.
    pub label: u32,
}

/// What sits between an element's two terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Device(ComponentSpec),
    Block(BlockRef),
}

impl Part {
    pub fn kind(&self) -> ElementKind {
        match self {
            Part::Device(spec) => spec.kind,
            Part::Block(_) => ElementKind::SubBlock,
        }
    }

    pub fn spec(&self) -> Option<&ComponentSpec> {
        match self {
            Part::Device(spec) => Some(spec),
            Part::Block(_) => None,
        }
    }

    pub fn block(&self) -> Option<&BlockRef> {
        match self {
            Part::Block(block) => Some(block),
            Part::Device(_) => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Part::Device(spec) => spec.name(),
            Part::Block(block) => format!("B{}", block.label),
        }
    }
}

/// Where an element sits on the generator's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub row: u32,
    pub col: u32,
    pub vertical: bool,
}

/// A two-terminal element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElemId,
    pub part: Part,
    /// Exactly 2 terminals: [pos, neg].
    pub terminals: [TermId; 2],
    /// Element whose probe drives this controlled source.
    pub control: Option<ElemId>,
    pub placement: Option<Placement>,
}

impl Element {
    pub fn pos(&self) -> TermId {
        self.terminals[0]
    }

    pub fn neg(&self) -> TermId {
        self.terminals[1]
    }

    pub fn kind(&self) -> ElementKind {
        self.part.kind()
    }
}

/// A named external terminal pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub pos: NodeId,
    pub neg: NodeId,
}

/// Port name every sub-block is wired through.
pub const INPUT_PORT: &str = "in";
/// Port spanning the element the transfer function observes.
pub const OUTPUT_PORT: &str = "out";

/// A validated, immutable circuit.
///
/// Stores nodes, elements and terminals in vectors indexed by their IDs plus
/// a compact node -> terminal adjacency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub(crate) nodes: Vec<Node>,
    pub(crate) elements: Vec<Element>,
    pub(crate) terminals: Vec<Terminal>,

    /// Offsets for node->terminal adjacency: node i's terminals are in node_terms[offsets[i]..offsets[i+1]].
    pub(crate) node_term_offsets: Vec<usize>,
    pub(crate) node_terms: Vec<TermId>,

    pub(crate) reference: NodeId,
    pub(crate) ports: Vec<Port>,
    pub(crate) level: u8,
    /// Grid dimensions (rows, cols) when produced by the grid generator.
    pub(crate) grid: Option<(u32, u32)>,
}

impl Circuit {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.idx())
    }

    pub fn element(&self, id: ElemId) -> Option<&Element> {
        self.elements.get(id.idx())
    }

    pub fn terminal(&self, id: TermId) -> Option<&Terminal> {
        self.terminals.get(id.idx())
    }

    /// Terminals incident to a node.
    pub fn node_terminals(&self, node_id: NodeId) -> &[TermId] {
        let idx = node_id.idx();
        if idx >= self.nodes.len() {
            return &[];
        }
        let start = self.node_term_offsets[idx];
        let end = self.node_term_offsets[idx + 1];
        &self.node_terms[start..end]
    }

    pub fn degree(&self, node_id: NodeId) -> usize {
        self.node_terminals(node_id).len()
    }

    /// (pos, neg) nodes of an element.
    pub fn element_nodes(&self, elem: ElemId) -> Option<(NodeId, NodeId)> {
        let e = self.element(elem)?;
        let pos = self.terminal(e.pos())?.node;
        let neg = self.terminal(e.neg())?.node;
        Some((pos, neg))
    }

    pub fn reference(&self) -> NodeId {
        self.reference
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// The reference node and every port node.
    pub fn is_boundary_node(&self, node: NodeId) -> bool {
        node == self.reference || self.ports.iter().any(|p| p.pos == node || p.neg == node)
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn grid(&self) -> Option<(u32, u32)> {
        self.grid
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn count_where(&self, pred: impl Fn(ElementKind) -> bool) -> usize {
        self.elements.iter().filter(|e| pred(e.kind())).count()
    }

    pub fn sub_blocks(&self) -> impl Iterator<Item = (&Element, &BlockRef)> {
        self.elements
            .iter()
            .filter_map(|e| e.part.block().map(|b| (e, b)))
    }

    pub fn is_flat(&self) -> bool {
        self.sub_blocks().next().is_none()
    }

    /// Undirected node/element view for connectivity queries.
    pub fn undirected(&self) -> UnGraph<NodeId, ElemId> {
        let mut g = UnGraph::with_capacity(self.nodes.len(), self.elements.len());
        let idx: Vec<_> = self.nodes.iter().map(|n| g.add_node(n.id)).collect();
        for e in &self.elements {
            if let Some((a, b)) = self.element_nodes(e.id) {
                g.add_edge(idx[a.idx()], idx[b.idx()], e.id);
            }
        }
        g
    }

    /// Number of galvanically separate sections.
    pub fn connected_sections(&self) -> usize {
        petgraph::algo::connected_components(&self.undirected())
    }
}
