//! Contraction priority
//!
//! `priority(v) = (added - removed) * difference_factor
//!              + depth(v) * depth_factor
//!              + contracted_neighbours(v) * contracted_factor`
//!
//! Lower contracts sooner. A factor of zero skips its term entirely, so a
//! zero `difference_factor` also skips the witness searches.

use crate::config::ContractionConfig;
use crate::contraction::{find_shortcuts, vertex_edges};
use crate::error::Result;
use crate::graph::{DirectedGraph, Vertex};
use crate::weight::WeightHandler;
use crate::witness::WitnessCalculator;

#[derive(Debug, Clone)]
pub struct EdgeDifferencePriority {
    witness: WitnessCalculator,
    difference_factor: f32,
    depth_factor: f32,
    contracted_factor: f32,
    depth: Vec<u32>,
    contracted_neighbours: Vec<u32>,
}

impl EdgeDifferencePriority {
    pub fn new(witness: WitnessCalculator) -> Self {
        Self {
            witness,
            difference_factor: 1.0,
            depth_factor: 1.0,
            contracted_factor: 1.0,
            depth: Vec::new(),
            contracted_neighbours: Vec::new(),
        }
    }

    pub fn from_config(config: &ContractionConfig) -> Self {
        Self::new(config.witness_calculator()).with_factors(
            config.difference_factor,
            config.depth_factor,
            config.contracted_factor,
        )
    }

    pub fn with_factors(mut self, difference: f32, depth: f32, contracted: f32) -> Self {
        self.difference_factor = difference;
        self.depth_factor = depth;
        self.contracted_factor = contracted;
        self
    }

    /// Witness search used both for the edge difference and for contraction.
    pub fn witness(&self) -> &WitnessCalculator {
        &self.witness
    }

    pub fn depth(&self, vertex: Vertex) -> u32 {
        self.depth.get(vertex as usize).copied().unwrap_or(0)
    }

    pub fn contracted_neighbours(&self, vertex: Vertex) -> u32 {
        self.contracted_neighbours
            .get(vertex as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Adjacency entries that disappear and appear if `vertex` is
    /// contracted now: its own entries, the entries its uncontracted
    /// neighbours hold towards it, and two entries per shortcut.
    pub fn edge_difference<H: WeightHandler>(
        &self,
        graph: &DirectedGraph,
        handler: H,
        contracted: &[bool],
        vertex: Vertex,
    ) -> Result<(usize, usize)> {
        let is_live = |v: Vertex| !contracted.get(v as usize).copied().unwrap_or(true);

        let mut edges = vertex_edges(graph, handler, vertex);
        let mut removed = edges.len();
        let mut seen = Vec::with_capacity(edges.len());
        for edge in &edges {
            if !is_live(edge.neighbour) || seen.contains(&edge.neighbour) {
                continue;
            }
            seen.push(edge.neighbour);
            removed += graph
                .edges(edge.neighbour)
                .filter(|e| e.neighbour() == vertex)
                .count();
        }
        edges.retain(|e| is_live(e.neighbour));

        let shortcuts = find_shortcuts(graph, handler, &self.witness, vertex, &edges)?;
        Ok((2 * shortcuts.len(), removed))
    }

    pub fn calculate<H: WeightHandler>(
        &self,
        graph: &DirectedGraph,
        handler: H,
        contracted: &[bool],
        vertex: Vertex,
    ) -> Result<f32> {
        let mut priority = 0.0;
        if self.difference_factor != 0.0 {
            let (added, removed) = self.edge_difference(graph, handler, contracted, vertex)?;
            priority += (added as f32 - removed as f32) * self.difference_factor;
        }
        if self.depth_factor != 0.0 {
            priority += self.depth(vertex) as f32 * self.depth_factor;
        }
        if self.contracted_factor != 0.0 {
            priority += self.contracted_neighbours(vertex) as f32 * self.contracted_factor;
        }
        Ok(priority)
    }

    /// Records that `vertex` was contracted. Its neighbours are read from the
    /// edges `vertex` keeps after contraction.
    pub fn notify_contracted(&mut self, graph: &DirectedGraph, vertex: Vertex) {
        let n = graph.vertex_count();
        if self.depth.len() < n {
            self.depth.resize(n, 0);
            self.contracted_neighbours.resize(n, 0);
        }

        let mut neighbours: Vec<Vertex> = graph.edges(vertex).map(|e| e.neighbour()).collect();
        neighbours.sort_unstable();
        neighbours.dedup();

        let depth = self.depth[vertex as usize] + 1;
        for neighbour in neighbours {
            let i = neighbour as usize;
            self.contracted_neighbours[i] += 1;
            self.depth[i] = self.depth[i].max(depth);
        }
    }
}
