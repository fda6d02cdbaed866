//! Grid placement model and its conversion into a circuit graph.
//!
//! An `rows x cols` grid of points carries `(rows-1) x cols` vertical and
//! `rows x (cols-1)` horizontal edges. Every edge holds one `ComponentSpec`;
//! a missing edge is an `Open` spec. Grid points joined by unprobed wires
//! collapse into one electrical node.

use std::collections::HashMap;

use cs_components::{ComponentSpec, ElementKind, Measure};
use cs_core::NodeId;
use cs_graph::{
    BlockRef, Circuit, CircuitBuilder, GraphResult, INPUT_PORT, OUTPUT_PORT, Part, Placement,
};
use petgraph::unionfind::UnionFind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Address of one grid edge.
///
/// A vertical edge joins `(row, col)` and `(row + 1, col)`; a horizontal edge
/// joins `(row, col)` and `(row, col + 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeRef {
    pub orientation: Orientation,
    pub row: u32,
    pub col: u32,
}

impl EdgeRef {
    pub fn vertical(row: u32, col: u32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            row,
            col,
        }
    }

    pub fn horizontal(row: u32, col: u32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            row,
            col,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            row: self.row,
            col: self.col,
            vertical: self.orientation == Orientation::Vertical,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: u32,
    cols: u32,
    vertical: Vec<ComponentSpec>,
    horizontal: Vec<ComponentSpec>,
}

impl Grid {
    /// An empty grid: every edge open.
    pub fn new(rows: u32, cols: u32) -> Self {
        let open = ComponentSpec::new(ElementKind::Open, 0, 0);
        let v = (rows.saturating_sub(1) * cols) as usize;
        let h = (rows * cols.saturating_sub(1)) as usize;
        Self {
            rows,
            cols,
            vertical: vec![open.clone(); v],
            horizontal: vec![open; h],
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn edge_count(&self) -> usize {
        self.vertical.len() + self.horizontal.len()
    }

    /// All edge addresses, vertical edges first, row-major.
    pub fn edge_refs(&self) -> Vec<EdgeRef> {
        let mut refs = Vec::with_capacity(self.edge_count());
        for row in 0..self.rows.saturating_sub(1) {
            for col in 0..self.cols {
                refs.push(EdgeRef::vertical(row, col));
            }
        }
        for row in 0..self.rows {
            for col in 0..self.cols.saturating_sub(1) {
                refs.push(EdgeRef::horizontal(row, col));
            }
        }
        refs
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeRef, &ComponentSpec)> + '_ {
        self.edge_refs()
            .into_iter()
            .filter_map(move |e| self.get(e).map(|spec| (e, spec)))
    }

    fn slot(&self, edge: EdgeRef) -> Option<usize> {
        match edge.orientation {
            Orientation::Vertical if edge.row + 1 < self.rows && edge.col < self.cols => {
                Some((edge.row * self.cols + edge.col) as usize)
            }
            Orientation::Horizontal if edge.row < self.rows && edge.col + 1 < self.cols => {
                Some((edge.row * (self.cols - 1) + edge.col) as usize)
            }
            _ => None,
        }
    }

    pub fn get(&self, edge: EdgeRef) -> Option<&ComponentSpec> {
        let slot = self.slot(edge)?;
        match edge.orientation {
            Orientation::Vertical => self.vertical.get(slot),
            Orientation::Horizontal => self.horizontal.get(slot),
        }
    }

    pub fn get_mut(&mut self, edge: EdgeRef) -> Option<&mut ComponentSpec> {
        let slot = self.slot(edge)?;
        match edge.orientation {
            Orientation::Vertical => self.vertical.get_mut(slot),
            Orientation::Horizontal => self.horizontal.get_mut(slot),
        }
    }

    /// Replace the spec on `edge`. Out-of-range edges are ignored.
    pub fn set(&mut self, edge: EdgeRef, spec: ComponentSpec) {
        if let Some(slot) = self.get_mut(edge) {
            *slot = spec;
        }
    }

    /// Edges on the grid's perimeter.
    pub fn is_outer(&self, edge: EdgeRef) -> bool {
        match edge.orientation {
            Orientation::Vertical => edge.col == 0 || edge.col + 1 == self.cols,
            Orientation::Horizontal => edge.row == 0 || edge.row + 1 == self.rows,
        }
    }

    fn point(&self, row: u32, col: u32) -> usize {
        (row * self.cols + col) as usize
    }

    /// Grid points joined by `edge`, in natural (top/left first) order.
    pub fn endpoints(&self, edge: EdgeRef) -> (usize, usize) {
        let a = self.point(edge.row, edge.col);
        let b = match edge.orientation {
            Orientation::Vertical => self.point(edge.row + 1, edge.col),
            Orientation::Horizontal => self.point(edge.row, edge.col + 1),
        };
        (a, b)
    }

    /// Edges of the given kind, in edge order.
    pub fn find(&self, kind: ElementKind) -> Vec<EdgeRef> {
        self.edges()
            .filter(|(_, spec)| spec.kind == kind)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn count(&self, kind: ElementKind) -> usize {
        self.edges().filter(|(_, spec)| spec.kind == kind).count()
    }

    /// A plain wire merges its endpoints; a wire carrying a current probe is
    /// kept as a zero-volt ammeter.
    fn merges(spec: &ComponentSpec) -> bool {
        spec.kind == ElementKind::Short && spec.probe.measure != Measure::Current
    }

    fn is_element(spec: &ComponentSpec) -> bool {
        spec.kind != ElementKind::Open && !Self::merges(spec)
    }

    /// Electrical node class of every grid point.
    ///
    /// Points touched by no element get `None`.
    pub fn discover_nodes(&self) -> Vec<Option<usize>> {
        let n_points = (self.rows * self.cols) as usize;
        let mut merged = UnionFind::<usize>::new(n_points);
        let mut used = vec![false; n_points];
        for (edge, spec) in self.edges() {
            let (a, b) = self.endpoints(edge);
            if Self::merges(spec) {
                merged.union(a, b);
            } else if Self::is_element(spec) {
                used[a] = true;
                used[b] = true;
            }
        }

        let mut live = vec![false; n_points];
        for p in (0..n_points).filter(|&p| used[p]) {
            live[merged.find(p)] = true;
        }

        // Classes are numbered by their first grid point.
        let mut numbering: HashMap<usize, usize> = HashMap::new();
        let mut class: Vec<Option<usize>> = vec![None; n_points];
        for (p, slot) in class.iter_mut().enumerate() {
            let root = merged.find(p);
            if live[root] {
                let next = numbering.len();
                *slot = Some(*numbering.entry(root).or_insert(next));
            }
        }
        class
    }

    /// Number of element terminals landing on each node class.
    pub fn node_degrees(&self) -> Vec<usize> {
        let class = self.discover_nodes();
        let n = class.iter().flatten().max().map_or(0, |m| m + 1);
        let mut degree = vec![0; n];
        for (edge, spec) in self.edges() {
            if !Self::is_element(spec) {
                continue;
            }
            let (a, b) = self.endpoints(edge);
            for p in [a, b] {
                if let Some(c) = class[p] {
                    degree[c] += 1;
                }
            }
        }
        degree
    }

    /// Flat circuit of this grid.
    pub fn to_circuit(&self) -> GraphResult<Circuit> {
        self.to_circuit_with_blocks(&HashMap::new(), 0)
    }

    /// Circuit of this grid with the given edges replaced by sub-blocks.
    ///
    /// The voltage source's negative terminal becomes the reference node `0`.
    /// Port `in` spans the source, port `out` spans the first element that is
    /// not a source.
    pub fn to_circuit_with_blocks(
        &self,
        blocks: &HashMap<EdgeRef, BlockRef>,
        level: u8,
    ) -> GraphResult<Circuit> {
        let class = self.discover_nodes();
        let elements: Vec<(EdgeRef, &ComponentSpec)> =
            self.edges().filter(|(_, s)| Self::is_element(s)).collect();

        let terminals = |edge: EdgeRef, spec: &ComponentSpec| -> (usize, usize) {
            let (a, b) = self.endpoints(edge);
            if spec.reversed { (b, a) } else { (a, b) }
        };

        let source = elements
            .iter()
            .find(|(_, s)| s.kind == ElementKind::VoltageSource)
            .copied();
        let reference_class = source
            .and_then(|(e, s)| class[terminals(e, s).1])
            .or_else(|| class.iter().flatten().copied().min());

        // Reference first, then remaining classes by first grid point.
        let mut order: Vec<usize> = Vec::new();
        if let Some(r) = reference_class {
            order.push(r);
        }
        for c in class.iter().flatten() {
            if !order.contains(c) {
                order.push(*c);
            }
        }

        let mut builder = CircuitBuilder::new();
        let mut node_of: HashMap<usize, NodeId> = HashMap::new();
        for (i, c) in order.iter().enumerate() {
            node_of.insert(*c, builder.add_node(i.to_string()));
        }
        let node = |p: usize| class[p].and_then(|c| node_of.get(&c).copied());

        let mut probe_owner: HashMap<(Measure, u8), cs_core::ElemId> = HashMap::new();
        let mut controlled = Vec::new();
        let mut placed = Vec::new();
        for (edge, spec) in &elements {
            let (p, n) = terminals(*edge, *spec);
            let (Some(pos), Some(neg)) = (node(p), node(n)) else {
                continue;
            };
            let part = match blocks.get(edge) {
                Some(block) => Part::Block(*block),
                None => Part::Device((*spec).clone()),
            };
            let id = builder.add_element(part, pos, neg);
            builder.set_placement(id, edge.placement());
            if let Some(label) = spec.probe.label
                && spec.probe.is_active()
            {
                probe_owner.insert((spec.probe.measure, label), id);
            }
            if let (Some(measure), Some(label)) = (spec.kind.controller_measure(), spec.control) {
                controlled.push((id, measure, label));
            }
            placed.push((id, spec.kind, pos, neg));
        }

        for (id, measure, label) in controlled {
            if let Some(&owner) = probe_owner.get(&(measure, label)) {
                builder.set_control(id, owner);
            }
        }

        if let Some(&(_, _, pos, neg)) = placed
            .iter()
            .find(|(_, k, _, _)| *k == ElementKind::VoltageSource)
        {
            builder.add_port(INPUT_PORT, pos, neg);
        }
        if let Some(&(_, _, pos, neg)) = placed
            .iter()
            .find(|(_, k, _, _)| !k.is_independent_source())
        {
            builder.add_port(OUTPUT_PORT, pos, neg);
        }

        if let Some(&reference) = reference_class.and_then(|c| node_of.get(&c)) {
            builder.set_reference(reference);
        }
        builder.set_level(level);
        builder.set_grid(self.rows, self.cols);
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_components::Probe;

    /// 2x2 loop: V on the left, R on the right, wires top and bottom.
    fn loop_grid() -> Grid {
        let mut grid = Grid::new(2, 2);
        grid.set(
            EdgeRef::vertical(0, 0),
            ComponentSpec::new(ElementKind::VoltageSource, 1, 5),
        );
        grid.set(
            EdgeRef::vertical(0, 1),
            ComponentSpec::new(ElementKind::Resistor, 1, 10),
        );
        grid.set(EdgeRef::horizontal(0, 0), ComponentSpec::wire());
        grid.set(EdgeRef::horizontal(1, 0), ComponentSpec::wire());
        grid
    }

    #[test]
    fn edge_counts() {
        let grid = Grid::new(3, 4);
        assert_eq!(grid.edge_count(), 2 * 4 + 3 * 3);
        assert!(grid.is_outer(EdgeRef::vertical(0, 0)));
        assert!(grid.is_outer(EdgeRef::horizontal(2, 1)));
        assert!(!grid.is_outer(EdgeRef::vertical(0, 1)));
        assert!(grid.get(EdgeRef::vertical(2, 0)).is_none());
    }

    #[test]
    fn wires_merge_points() {
        let grid = loop_grid();
        let class = grid.discover_nodes();
        assert_eq!(class[0], class[1]);
        assert_eq!(class[2], class[3]);
        assert_ne!(class[0], class[2]);
        assert_eq!(grid.node_degrees(), vec![2, 2]);
    }

    #[test]
    fn source_negative_terminal_is_reference() {
        let grid = loop_grid();
        let circuit = grid.to_circuit().unwrap();
        assert_eq!(circuit.nodes().len(), 2);
        assert_eq!(circuit.elements().len(), 2);
        let v = &circuit.elements()[0];
        let (_, neg) = circuit.element_nodes(v.id).unwrap();
        assert_eq!(neg, circuit.reference());
        assert_eq!(circuit.node(neg).unwrap().name, "0");
        assert!(circuit.port(INPUT_PORT).is_some());
        assert!(circuit.port(OUTPUT_PORT).is_some());
    }

    #[test]
    fn probed_wire_stays_an_element() {
        let mut grid = loop_grid();
        grid.set(
            EdgeRef::horizontal(0, 0),
            ComponentSpec::wire().with_probe(Probe::current(3)),
        );
        let circuit = grid.to_circuit().unwrap();
        assert_eq!(circuit.nodes().len(), 3);
        assert_eq!(circuit.count(ElementKind::Short), 1);
    }

    #[test]
    fn wire_chains_merge_transitively() {
        // Wires run along the top row and down the right column.
        let mut grid = Grid::new(3, 3);
        grid.set(EdgeRef::horizontal(0, 0), ComponentSpec::wire());
        grid.set(EdgeRef::horizontal(0, 1), ComponentSpec::wire());
        grid.set(EdgeRef::vertical(0, 2), ComponentSpec::wire());
        grid.set(EdgeRef::vertical(1, 2), ComponentSpec::wire());
        grid.set(
            EdgeRef::vertical(0, 0),
            ComponentSpec::new(ElementKind::Resistor, 1, 1),
        );
        let class = grid.discover_nodes();
        for p in [0, 1, 2, 5, 8] {
            assert_eq!(class[p], Some(0), "point {p}");
        }
        assert_eq!(class[3], Some(1));
        assert!(class[4].is_none() && class[6].is_none() && class[7].is_none());
        assert_eq!(grid.node_degrees(), vec![1, 1]);
    }

    #[test]
    fn isolated_points_have_no_node() {
        let mut grid = Grid::new(3, 3);
        grid.set(
            EdgeRef::vertical(0, 0),
            ComponentSpec::new(ElementKind::Resistor, 1, 1),
        );
        let class = grid.discover_nodes();
        assert_eq!(class.iter().flatten().count(), 2);
        assert!(class[8].is_none());
    }
}
