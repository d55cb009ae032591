//! Single-source search
//!
//! Dijkstra over a [`DirectedGraph`] from one or more seeded roots. A
//! forward search relaxes edges traversable from the stored `from` to the
//! neighbour; a backward search relaxes edges traversable from the neighbour
//! back to the current vertex, building a tree of paths *into* the roots.
//!
//! The same engine drives the witness search (exclusion set, hop limit,
//! weight cap, stop targets) and the queries on a contracted graph.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::graph::{backward_allowed, forward_allowed, DirectedGraph, Vertex};
use crate::path::{encode_edge, EdgePath, PathId, PathTree};
use crate::weight::WeightHandler;
use crate::RunState;

/// Heap entry ordered by metric, then vertex, then insertion order.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    metric: f32,
    vertex: Vertex,
    path: PathId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.metric
            .total_cmp(&other.metric)
            .then_with(|| self.vertex.cmp(&other.vertex))
            .then_with(|| self.path.cmp(&other.path))
    }
}

pub struct Dykstra<'a, H: WeightHandler> {
    graph: &'a DirectedGraph,
    handler: H,
    roots: Vec<EdgePath<H::Weight>>,
    backward: bool,
    excluded: FxHashSet<Vertex>,
    targets: FxHashSet<Vertex>,
    max_settles: Option<usize>,
    max_weight: Option<H::Weight>,
    max_hops: u32,
    state: RunState,
    tree: PathTree<H::Weight>,
    hops: Vec<u32>,
    visits: FxHashMap<Vertex, PathId>,
}

impl<'a, H: WeightHandler> Dykstra<'a, H> {
    /// Creates a search from `roots`. Fails when a root lies outside the
    /// graph.
    pub fn new(
        graph: &'a DirectedGraph,
        handler: H,
        roots: Vec<EdgePath<H::Weight>>,
        backward: bool,
    ) -> Result<Self> {
        for root in &roots {
            graph.check_vertex(root.vertex)?;
        }
        Ok(Self {
            graph,
            handler,
            roots,
            backward,
            excluded: FxHashSet::default(),
            targets: FxHashSet::default(),
            max_settles: None,
            max_weight: None,
            max_hops: u32::MAX,
            state: RunState::NotRun,
            tree: PathTree::new(),
            hops: Vec::new(),
            visits: FxHashMap::default(),
        })
    }

    /// Search from a single vertex with zero initial weight.
    pub fn from_vertex(
        graph: &'a DirectedGraph,
        handler: H,
        vertex: Vertex,
        backward: bool,
    ) -> Result<Self> {
        let root = EdgePath::root(vertex, handler.zero());
        Self::new(graph, handler, vec![root], backward)
    }

    /// Vertices that are never settled nor relaxed through.
    pub fn with_exclusions(mut self, excluded: impl IntoIterator<Item = Vertex>) -> Self {
        self.excluded.extend(excluded);
        self
    }

    /// Stops as soon as every one of `targets` is settled.
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = Vertex>) -> Self {
        self.targets.extend(targets);
        self
    }

    pub fn with_max_settles(mut self, max_settles: Option<usize>) -> Self {
        self.max_settles = max_settles;
        self
    }

    /// Paths heavier than `max_weight` are not explored.
    pub fn with_max_weight(mut self, max_weight: Option<H::Weight>) -> Self {
        self.max_weight = max_weight;
        self
    }

    /// Maximum number of edges on any explored path; `u32::MAX` is unbounded.
    pub fn with_max_hops(mut self, max_hops: u32) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn is_backward(&self) -> bool {
        self.backward
    }

    pub fn has_run(&self) -> bool {
        self.state.has_run()
    }

    pub fn has_succeeded(&self) -> bool {
        self.state.has_succeeded()
    }

    pub fn run(&mut self) -> Result<()> {
        self.state.start()?;

        let mut heap = BinaryHeap::new();
        for root in std::mem::take(&mut self.roots) {
            if self.excluded.contains(&root.vertex) {
                continue;
            }
            let metric = self.handler.metric(root.weight);
            let vertex = root.vertex;
            let path = self.tree.push(root);
            self.hops.push(0);
            heap.push(Reverse(QueueEntry { metric, vertex, path }));
        }

        let mut remaining = self.targets.len();
        while let Some(Reverse(entry)) = heap.pop() {
            if self.visits.contains_key(&entry.vertex) {
                continue;
            }
            self.visits.insert(entry.vertex, entry.path);

            if self.targets.contains(&entry.vertex) {
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
            if self.max_settles.is_some_and(|max| self.visits.len() >= max) {
                break;
            }
            self.relax(entry.path, &mut heap);
        }

        self.state = RunState::Succeeded;
        Ok(())
    }

    fn relax(&mut self, id: PathId, heap: &mut BinaryHeap<Reverse<QueueEntry>>) {
        let hops = self.hops[id.index()];
        if hops >= self.max_hops {
            return;
        }
        let current = self.tree.get(id);
        let (vertex, weight) = (current.vertex, current.weight);
        let graph = self.graph;

        for edge in graph.edges(vertex) {
            let (edge_weight, direction) = self.handler.get_edge_weight(&edge);
            let traversable = if self.backward {
                backward_allowed(direction)
            } else {
                forward_allowed(direction)
            };
            let neighbour = edge.neighbour();
            if !traversable
                || self.excluded.contains(&neighbour)
                || self.visits.contains_key(&neighbour)
            {
                continue;
            }

            let total = self.handler.add(weight, edge_weight);
            if let Some(cap) = self.max_weight {
                if self.handler.is_smaller(cap, total) {
                    continue;
                }
            }

            let code = encode_edge(edge.id(), !self.backward);
            let path = self.tree.push_child(id, neighbour, total, code);
            self.hops.push(hops + 1);
            heap.push(Reverse(QueueEntry {
                metric: self.handler.metric(total),
                vertex: neighbour,
                path,
            }));
        }
    }

    /// Settled path to `vertex`, if any.
    pub fn try_get_visit(&self, vertex: Vertex) -> Option<&EdgePath<H::Weight>> {
        self.visits.get(&vertex).map(|&id| self.tree.get(id))
    }

    pub fn visit_id(&self, vertex: Vertex) -> Option<PathId> {
        self.visits.get(&vertex).copied()
    }

    pub fn tree(&self) -> &PathTree<H::Weight> {
        &self.tree
    }

    /// Every settled vertex with its path.
    pub fn visits(&self) -> impl Iterator<Item = (Vertex, &EdgePath<H::Weight>)> + '_ {
        self.visits.iter().map(|(&v, &id)| (v, self.tree.get(id)))
    }

    pub fn settled_count(&self) -> usize {
        self.visits.len()
    }

    /// Vertices from the root to `vertex`. For a backward search this is
    /// the reverse of travel order.
    pub fn path_to(&self, vertex: Vertex) -> Option<Vec<Vertex>> {
        self.visit_id(vertex).map(|id| self.tree.vertices(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{reverse_direction, NO_VERTEX};
    use crate::weight::DefaultWeightHandler;

    fn graph(edges: &[(Vertex, Vertex, f32, Option<bool>)]) -> DirectedGraph {
        let h = DefaultWeightHandler;
        let mut graph = h.create_graph();
        for &(from, to, w, d) in edges {
            h.add_edge(&mut graph, from, to, w, d, NO_VERTEX).unwrap();
            h.add_edge(&mut graph, to, from, w, reverse_direction(d), NO_VERTEX).unwrap();
        }
        graph.compress();
        graph
    }

    #[test]
    fn test_one_edge_forward_and_backward() {
        let g = graph(&[(0, 1, 100.0, None)]);

        let mut forward = Dykstra::from_vertex(&g, DefaultWeightHandler, 0, false).unwrap();
        forward.run().unwrap();
        assert!(forward.has_succeeded());
        let visit = forward.try_get_visit(1).unwrap();
        assert_eq!(visit.weight, 100.0);
        assert_eq!(forward.tree().get(visit.from().unwrap()).vertex, 0);

        let mut backward = Dykstra::from_vertex(&g, DefaultWeightHandler, 1, true).unwrap();
        backward.run().unwrap();
        let visit = backward.try_get_visit(1).unwrap();
        assert_eq!(visit.weight, 0.0);
        assert!(visit.from().is_none());
    }

    #[test]
    fn test_one_way_edges() {
        let g = graph(&[(0, 1, 10.0, Some(true)), (1, 2, 10.0, Some(false))]);

        let mut forward = Dykstra::from_vertex(&g, DefaultWeightHandler, 1, false).unwrap();
        forward.run().unwrap();
        assert!(forward.try_get_visit(0).is_none());
        assert!(forward.try_get_visit(2).is_none());

        let mut backward = Dykstra::from_vertex(&g, DefaultWeightHandler, 1, true).unwrap();
        backward.run().unwrap();
        assert_eq!(backward.try_get_visit(0).map(|p| p.weight), Some(10.0));
        assert_eq!(backward.try_get_visit(2).map(|p| p.weight), Some(10.0));
        assert!(backward.try_get_visit(0).unwrap().edge < 0);
    }

    #[test]
    fn test_exclusion_forces_detour() {
        let g = graph(&[
            (0, 1, 1.0, None),
            (1, 2, 1.0, None),
            (0, 3, 5.0, None),
            (3, 2, 5.0, None),
        ]);

        let mut search = Dykstra::from_vertex(&g, DefaultWeightHandler, 0, false)
            .unwrap()
            .with_exclusions([1]);
        search.run().unwrap();
        assert!(search.try_get_visit(1).is_none());
        assert_eq!(search.try_get_visit(2).map(|p| p.weight), Some(10.0));
        assert_eq!(search.path_to(2), Some(vec![0, 3, 2]));
    }

    #[test]
    fn test_bounds() {
        let g = graph(&[(0, 1, 1.0, None), (1, 2, 1.0, None), (2, 3, 1.0, None)]);

        let mut hops = Dykstra::from_vertex(&g, DefaultWeightHandler, 0, false)
            .unwrap()
            .with_max_hops(1);
        hops.run().unwrap();
        assert_eq!(hops.settled_count(), 2);

        let mut capped = Dykstra::from_vertex(&g, DefaultWeightHandler, 0, false)
            .unwrap()
            .with_max_weight(Some(2.0));
        capped.run().unwrap();
        assert!(capped.try_get_visit(2).is_some());
        assert!(capped.try_get_visit(3).is_none());

        let mut settles = Dykstra::from_vertex(&g, DefaultWeightHandler, 0, false)
            .unwrap()
            .with_max_settles(Some(3));
        settles.run().unwrap();
        assert_eq!(settles.settled_count(), 3);
    }

    #[test]
    fn test_multiple_roots_with_offsets() {
        let g = graph(&[(0, 1, 10.0, None), (1, 2, 10.0, None)]);
        let roots = vec![EdgePath::root(0, 3.0), EdgePath::root(2, 1.0)];

        let mut search = Dykstra::new(&g, DefaultWeightHandler, roots, false).unwrap();
        search.run().unwrap();
        assert_eq!(search.try_get_visit(1).map(|p| p.weight), Some(11.0));
        assert_eq!(search.path_to(1), Some(vec![2, 1]));
    }

    #[test]
    fn test_roots_out_of_bounds_fail_fast() {
        let g = graph(&[(0, 1, 10.0, None)]);
        assert!(Dykstra::from_vertex(&g, DefaultWeightHandler, 5, false).is_err());
    }

    #[test]
    fn test_single_shot() {
        let g = graph(&[(0, 1, 10.0, None)]);
        let mut search = Dykstra::from_vertex(&g, DefaultWeightHandler, 0, false).unwrap();
        assert!(!search.has_run());
        search.run().unwrap();
        assert!(search.has_run());
        assert!(search.run().is_err());
    }
}
