//! Hierarchy construction
//!
//! Vertices are contracted one at a time in priority order. The queue is
//! lazy: a popped vertex has its priority recomputed and is only contracted
//! when the fresh value still beats the next queued entry; otherwise it is
//! pushed back with the fresh value. Equal priorities go to the lowest
//! vertex id, which makes the resulting hierarchy deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::VecDeque;
use std::time::Instant;

use priority_queue::PriorityQueue;

use crate::config::ContractionConfig;
use crate::contraction::contract_vertex;
use crate::error::Result;
use crate::graph::{DirectedGraph, Vertex};
use crate::priority::EdgeDifferencePriority;
use crate::weight::WeightHandler;
use crate::RunState;

/// Statistics from hierarchy construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractionStats {
    pub vertex_count: usize,
    pub original_edges: usize,
    pub shortcuts_added: usize,
    pub final_edges: usize,
    pub requeued: usize,
    pub queue_rebuilds: usize,
    pub elapsed_ms: u64,
}

/// Queue key: priority, then vertex id.
#[derive(Debug, Clone, Copy)]
struct QueueKey {
    priority: f32,
    vertex: Vertex,
}

impl PartialEq for QueueKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueKey {}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.vertex.cmp(&other.vertex))
    }
}

/// Contracts a graph in place into a contraction hierarchy.
///
/// Every edge must be stored at both endpoints, the copy at `to` carrying
/// the reversed direction, as [`crate::build_graph`] does. A graph that
/// breaks this fails the run with [`crate::ChError::Corrupt`] before
/// anything is contracted. Shortcuts are searched with the witness
/// calculator of the priority.
pub struct HierarchyBuilder<'a, H: WeightHandler> {
    graph: &'a mut DirectedGraph,
    handler: H,
    priority: EdgeDifferencePriority,
    misses_window: Option<usize>,
    state: RunState,
    contracted: Vec<bool>,
    order: Vec<Vertex>,
    queue: PriorityQueue<Vertex, Reverse<QueueKey>>,
    misses: VecDeque<bool>,
    stats: ContractionStats,
}

impl<'a, H: WeightHandler> HierarchyBuilder<'a, H> {
    pub fn new(graph: &'a mut DirectedGraph, handler: H, priority: EdgeDifferencePriority) -> Self {
        Self {
            graph,
            handler,
            priority,
            misses_window: None,
            state: RunState::NotRun,
            contracted: Vec::new(),
            order: Vec::new(),
            queue: PriorityQueue::new(),
            misses: VecDeque::new(),
            stats: ContractionStats::default(),
        }
    }

    pub fn from_config(
        graph: &'a mut DirectedGraph,
        handler: H,
        config: &ContractionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let builder = Self::new(graph, handler, EdgeDifferencePriority::from_config(config));
        Ok(builder.with_misses_window(config.misses_window))
    }

    pub fn with_misses_window(mut self, window: Option<usize>) -> Self {
        self.misses_window = window;
        self
    }

    pub fn has_run(&self) -> bool {
        self.state.has_run()
    }

    pub fn has_succeeded(&self) -> bool {
        self.state.has_succeeded()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Vertices in the order they were contracted.
    pub fn order(&self) -> &[Vertex] {
        &self.order
    }

    pub fn is_contracted(&self, vertex: Vertex) -> bool {
        self.contracted.get(vertex as usize).copied().unwrap_or(false)
    }

    pub fn stats(&self) -> &ContractionStats {
        &self.stats
    }

    /// Contracts every vertex of the graph. Single-shot: a failed run leaves
    /// a partially contracted graph and must be redone from the original.
    pub fn run(&mut self) -> Result<ContractionStats> {
        self.state.start()?;
        match self.contract_all() {
            Ok(()) => {
                self.state = RunState::Succeeded;
                Ok(self.stats.clone())
            }
            Err(e) => {
                tracing::error!(error = %e, contracted = self.order.len(), "contraction failed");
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn contract_all(&mut self) -> Result<()> {
        let start = Instant::now();
        self.handler.check_mirrored(&*self.graph)?;
        let n = self.graph.vertex_count();
        self.contracted = vec![false; n];
        self.order = Vec::with_capacity(n);
        self.stats = ContractionStats {
            vertex_count: n,
            original_edges: self.graph.edge_count(),
            ..ContractionStats::default()
        };
        tracing::info!(
            vertices = n,
            edges = self.stats.original_edges,
            "building contraction hierarchy"
        );

        for vertex in 0..n as Vertex {
            self.enqueue(vertex)?;
        }

        while let Some(vertex) = self.select_next()? {
            self.contract(vertex)?;
        }

        self.graph.compress();
        self.stats.final_edges = self.graph.edge_count();
        self.stats.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            shortcuts = self.stats.shortcuts_added,
            final_edges = self.stats.final_edges,
            requeued = self.stats.requeued,
            queue_rebuilds = self.stats.queue_rebuilds,
            elapsed_ms = self.stats.elapsed_ms,
            "contraction hierarchy built"
        );
        Ok(())
    }

    fn fresh_key(&self, vertex: Vertex) -> Result<QueueKey> {
        let priority = self
            .priority
            .calculate(&*self.graph, self.handler, &self.contracted, vertex)?;
        Ok(QueueKey { priority, vertex })
    }

    fn enqueue(&mut self, vertex: Vertex) -> Result<()> {
        let key = self.fresh_key(vertex)?;
        self.queue.push(vertex, Reverse(key));
        Ok(())
    }

    /// Pops the next vertex whose recomputed priority is still the lowest.
    fn select_next(&mut self) -> Result<Option<Vertex>> {
        while let Some((vertex, _)) = self.queue.pop() {
            let key = self.fresh_key(vertex)?;
            let stale = match self.queue.peek() {
                Some((_, Reverse(head))) => key > *head,
                None => false,
            };
            if !stale {
                self.record_miss(false);
                return Ok(Some(vertex));
            }

            self.queue.push(vertex, Reverse(key));
            self.stats.requeued += 1;
            if self.record_miss(true) {
                self.rebuild_queue()?;
            }
        }
        Ok(None)
    }

    /// Tracks the last re-validations; true when the whole window missed.
    fn record_miss(&mut self, miss: bool) -> bool {
        let Some(window) = self.misses_window else {
            return false;
        };
        self.misses.push_back(miss);
        if self.misses.len() > window {
            self.misses.pop_front();
        }
        self.misses.len() == window && self.misses.iter().all(|&m| m)
    }

    fn rebuild_queue(&mut self) -> Result<()> {
        let mut vertices: Vec<Vertex> = self.queue.iter().map(|(&v, _)| v).collect();
        vertices.sort_unstable();
        tracing::debug!(queued = vertices.len(), "recalculating all queued priorities");

        self.queue.clear();
        for vertex in vertices {
            self.enqueue(vertex)?;
        }
        self.misses.clear();
        self.stats.queue_rebuilds += 1;
        Ok(())
    }

    fn contract(&mut self, vertex: Vertex) -> Result<()> {
        let result = contract_vertex(
            &mut *self.graph,
            self.handler,
            self.priority.witness(),
            &self.contracted,
            vertex,
        )?;
        self.contracted[vertex as usize] = true;
        self.order.push(vertex);
        self.stats.shortcuts_added += result.shortcuts_applied;
        self.priority.notify_contracted(&*self.graph, vertex);

        tracing::trace!(
            vertex,
            rank = self.order.len() - 1,
            neighbours = result.neighbours.len(),
            shortcuts = result.shortcuts_applied,
            "contracted vertex"
        );

        for neighbour in result.neighbours {
            self.enqueue(neighbour)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{reverse_direction, NO_VERTEX};
    use crate::weight::{DefaultWeightHandler, EdgeData};
    use crate::witness::WitnessCalculator;
    use crate::ChError;

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

    fn edges_at(g: &DirectedGraph, v: Vertex) -> Vec<(Vertex, EdgeData<f32>)> {
        let mut e: Vec<_> = g
            .edges(v)
            .map(|e| (e.neighbour(), DefaultWeightHandler.get_edge(&e)))
            .collect();
        e.sort_by_key(|(n, _)| *n);
        e
    }

    #[test]
    fn test_queue_key_ties_go_to_lowest_vertex() {
        let mut queue = PriorityQueue::new();
        queue.push(3u32, Reverse(QueueKey { priority: -2.0, vertex: 3 }));
        queue.push(1u32, Reverse(QueueKey { priority: -2.0, vertex: 1 }));
        queue.push(0u32, Reverse(QueueKey { priority: 5.0, vertex: 0 }));
        assert_eq!(queue.pop().map(|(v, _)| v), Some(1));
        assert_eq!(queue.pop().map(|(v, _)| v), Some(3));
    }

    #[test]
    fn test_pentagon_contracts_vertex_zero_first() {
        let mut g = graph(&[
            (0, 1, 100.0, None),
            (1, 2, 100.0, None),
            (2, 3, 100.0, None),
            (3, 4, 100.0, None),
            (4, 0, 100.0, None),
        ]);
        let config = ContractionConfig::edge_difference_only();
        let mut builder =
            HierarchyBuilder::from_config(&mut g, DefaultWeightHandler, &config).unwrap();
        builder.run().unwrap();
        assert!(builder.has_succeeded());
        assert_eq!(builder.order()[0], 0);
        drop(builder);

        // Vertex 0 keeps its upward edges, 1 and 4 lost theirs to 0.
        let at0: Vec<_> = edges_at(&g, 0).iter().map(|(n, _)| *n).collect();
        assert_eq!(at0, vec![1, 4]);
        assert!(edges_at(&g, 1).iter().all(|(n, _)| *n != 0));
        assert!(edges_at(&g, 4).iter().all(|(n, _)| *n != 0));
    }

    #[test]
    fn test_run_is_single_shot() {
        let mut g = graph(&[(0, 1, 1.0, None)]);
        let config = ContractionConfig::default();
        let mut builder =
            HierarchyBuilder::from_config(&mut g, DefaultWeightHandler, &config).unwrap();
        assert!(!builder.has_run());
        builder.run().unwrap();
        assert_eq!(builder.run(), Err(ChError::AlreadyRun));
        assert_eq!(builder.state(), RunState::Succeeded);
    }

    #[test]
    fn test_every_vertex_contracted_once() {
        let mut g = graph(&[
            (0, 1, 3.0, None),
            (1, 2, 4.0, Some(true)),
            (2, 3, 1.0, None),
            (3, 0, 2.0, Some(false)),
            (1, 3, 7.0, None),
        ]);
        let config = ContractionConfig::default();
        let mut builder =
            HierarchyBuilder::from_config(&mut g, DefaultWeightHandler, &config).unwrap();
        let stats = builder.run().unwrap();
        let mut order = builder.order().to_vec();
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(stats.vertex_count, 4);
        assert!((0..4).all(|v| builder.is_contracted(v)));
    }

    #[test]
    fn test_tiny_misses_window_still_terminates() {
        let mut g = graph(&[
            (0, 1, 1.0, None),
            (1, 2, 1.0, None),
            (2, 3, 1.0, None),
            (3, 4, 1.0, None),
            (4, 5, 1.0, None),
            (5, 0, 1.0, None),
            (1, 4, 1.0, None),
        ]);
        let config = ContractionConfig {
            misses_window: Some(1),
            ..ContractionConfig::default()
        };
        let mut builder =
            HierarchyBuilder::from_config(&mut g, DefaultWeightHandler, &config).unwrap();
        builder.run().unwrap();
        assert_eq!(builder.order().len(), 6);
    }

    #[test]
    fn test_edges_stored_at_one_end_fail_the_run() {
        let h = DefaultWeightHandler;
        let mut g = h.create_graph();
        h.add_edge(&mut g, 1, 0, 10.0, None, NO_VERTEX).unwrap();
        h.add_edge(&mut g, 1, 2, 10.0, None, NO_VERTEX).unwrap();
        h.add_edge(&mut g, 3, 2, 10.0, None, NO_VERTEX).unwrap();
        let before = g.clone();

        let config = ContractionConfig::default();
        let mut builder =
            HierarchyBuilder::from_config(&mut g, DefaultWeightHandler, &config).unwrap();
        assert!(matches!(builder.run(), Err(ChError::Corrupt(_))));
        assert_eq!(builder.state(), RunState::Failed);
        assert!(builder.order().is_empty());
        drop(builder);
        assert_eq!(g, before);
    }

    #[test]
    fn test_contraction_uses_priority_witness() {
        // Contracting 0 first needs 1 - 3 (15) unless 1 - 2 - 3 witnesses it.
        let square = || {
            graph(&[
                (0, 1, 10.0, None),
                (1, 2, 10.0, None),
                (0, 3, 5.0, None),
                (3, 2, 5.0, None),
            ])
        };
        let shortcuts = |witness: WitnessCalculator| {
            let mut g = square();
            let priority = EdgeDifferencePriority::new(witness).with_factors(0.0, 0.0, 0.0);
            let mut builder = HierarchyBuilder::new(&mut g, DefaultWeightHandler, priority);
            let stats = builder.run().unwrap();
            assert_eq!(builder.order(), &[0, 1, 2, 3]);
            stats.shortcuts_added
        };
        assert_eq!(shortcuts(WitnessCalculator::default()), 0);
        assert!(shortcuts(WitnessCalculator::new(0)) > 0);
    }
}
