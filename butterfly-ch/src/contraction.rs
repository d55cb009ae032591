//! Contraction of a single vertex
//!
//! Contracting `V` removes the entries its neighbours hold towards `V` and
//! adds a shortcut between every pair of neighbours `A`, `B` whose path
//! through `V` has no witness. `V` keeps its own edges: once every vertex
//! is contracted, each adjacency only holds edges towards vertices
//! contracted later, which is exactly what the upward queries relax.

use crate::error::{ChError, Result};
use crate::graph::{
    backward_allowed, forward_allowed, reverse_direction, DirectedGraph, Vertex,
};
use crate::weight::WeightHandler;
use crate::witness::WitnessCalculator;

/// Decoded edge stored at the vertex being contracted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexEdge<W> {
    pub neighbour: Vertex,
    pub weight: W,
    pub direction: Option<bool>,
}

/// Shortcut `from -> to` through a contracted vertex, with its direction
/// relative to that orientation. The mirror entry at `to` is implied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortcut<W> {
    pub from: Vertex,
    pub to: Vertex,
    pub weight: W,
    pub direction: Option<bool>,
}

pub fn vertex_edges<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    vertex: Vertex,
) -> Vec<VertexEdge<H::Weight>> {
    graph
        .edges(vertex)
        .map(|edge| {
            let (weight, direction) = handler.get_edge_weight(&edge);
            VertexEdge {
                neighbour: edge.neighbour(),
                weight,
                direction,
            }
        })
        .collect()
}

/// Shortcuts needed if `vertex` were removed, given its live `edges`.
///
/// Pairs are visited once: for edge `j` (neighbour `A`) every earlier edge
/// `k` (neighbour `B`) is a target. The forward flag covers `A -> V -> B`,
/// the backward flag covers `B -> V -> A`; a pair that cannot be travelled
/// through `V` in a direction starts out witnessed in that direction.
pub fn find_shortcuts<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    witness: &WitnessCalculator,
    vertex: Vertex,
    edges: &[VertexEdge<H::Weight>],
) -> Result<Vec<Shortcut<H::Weight>>> {
    let mut shortcuts = Vec::new();
    let mut targets = Vec::with_capacity(edges.len());
    let mut weights = Vec::with_capacity(edges.len());
    let mut forward = Vec::with_capacity(edges.len());
    let mut backward = Vec::with_capacity(edges.len());

    for j in 1..edges.len() {
        let first = &edges[j];
        targets.clear();
        weights.clear();
        forward.clear();
        backward.clear();

        for second in &edges[..j] {
            targets.push(second.neighbour);
            weights.push(handler.add(first.weight, second.weight));
            if second.neighbour == first.neighbour {
                forward.push(true);
                backward.push(true);
                continue;
            }
            let (into, out) = (first.direction, second.direction);
            let via_forward = backward_allowed(into) && forward_allowed(out);
            let via_backward = forward_allowed(into) && backward_allowed(out);
            forward.push(!via_forward);
            backward.push(!via_backward);
        }

        witness.calculate(
            graph,
            handler,
            first.neighbour,
            &targets,
            &weights,
            &mut forward,
            &mut backward,
            vertex,
        )?;

        for k in 0..targets.len() {
            let direction = match (forward[k], backward[k]) {
                (true, true) => continue,
                (false, false) => None,
                (false, true) => Some(true),
                (true, false) => Some(false),
            };
            shortcuts.push(Shortcut {
                from: first.neighbour,
                to: targets[k],
                weight: weights[k],
                direction,
            });
        }
    }
    Ok(shortcuts)
}

/// What a contraction changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractedVertex {
    /// Neighbours that were still uncontracted.
    pub neighbours: Vec<Vertex>,
    pub shortcuts: usize,
    /// Shortcuts that actually added or improved an edge.
    pub shortcuts_applied: usize,
}

/// Contracts `vertex`. `contracted` marks the vertices contracted before it.
pub fn contract_vertex<H: WeightHandler>(
    graph: &mut DirectedGraph,
    handler: H,
    witness: &WitnessCalculator,
    contracted: &[bool],
    vertex: Vertex,
) -> Result<ContractedVertex> {
    if contracted.get(vertex as usize).copied().unwrap_or(true) {
        return Err(ChError::Corrupt(format!(
            "vertex {vertex} is unknown or already contracted"
        )));
    }

    let mut edges = vertex_edges(graph, handler, vertex);
    let mut neighbours = Vec::with_capacity(edges.len());
    for edge in &edges {
        match contracted.get(edge.neighbour as usize) {
            Some(false) => {
                graph.remove_edge(edge.neighbour, vertex);
                neighbours.push(edge.neighbour);
            }
            Some(true) => {
                graph.remove_edge(vertex, edge.neighbour);
            }
            None => {
                return Err(ChError::Corrupt(format!(
                    "edge {vertex} -> {} points outside the graph",
                    edge.neighbour
                )));
            }
        }
    }
    edges.retain(|e| !contracted[e.neighbour as usize]);
    neighbours.sort_unstable();
    neighbours.dedup();

    let shortcuts = find_shortcuts(graph, handler, witness, vertex, &edges)?;
    let mut applied = 0;
    for s in &shortcuts {
        let a = handler.add_or_update_edge(graph, s.from, s.to, s.direction, s.weight, vertex)?;
        let b = handler.add_or_update_edge(
            graph,
            s.to,
            s.from,
            reverse_direction(s.direction),
            s.weight,
            vertex,
        )?;
        if a || b {
            applied += 1;
        }
    }

    Ok(ContractedVertex {
        neighbours,
        shortcuts: shortcuts.len(),
        shortcuts_applied: applied,
    })
}
