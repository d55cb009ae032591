//! Weight strategies
//!
//! Every search and contraction routine is generic over [`WeightHandler`],
//! which owns the arithmetic on weights and their encoding into edge
//! payloads. Payload layout for graphs built by a handler:
//!
//! - `data[0]`: direction code (0 both ways, 1 forward only, 2 backward only)
//! - `data[1..]`: [`WeightHandler::size`] words of encoded weight
//! - `meta[0]`: contracted vertex id, [`NO_VERTEX`] for original edges

mod augmented;

pub use augmented::{AugmentedWeight, AugmentedWeightHandler};

use std::fmt::Debug;

use crate::error::{ChError, Result};
use crate::graph::{
    backward_allowed, forward_allowed, reverse_direction, DirectedGraph, EdgeId, EdgeRef, Vertex,
    NO_VERTEX,
};
use crate::network::Factor;

/// Decoded edge payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeData<W> {
    pub weight: W,
    pub direction: Option<bool>,
    pub contracted_id: Vertex,
}

impl<W> EdgeData<W> {
    pub fn is_shortcut(&self) -> bool {
        self.contracted_id != NO_VERTEX
    }
}

pub fn encode_direction(direction: Option<bool>) -> u32 {
    match direction {
        None => 0,
        Some(true) => 1,
        Some(false) => 2,
    }
}

pub fn decode_direction(code: u32) -> Option<bool> {
    match code {
        1 => Some(true),
        2 => Some(false),
        _ => None,
    }
}

pub trait WeightHandler: Copy + Send + Sync {
    type Weight: Copy + PartialEq + Debug + Send + Sync;

    fn zero(&self) -> Self::Weight;

    /// Sentinel for "unreachable"; never stored on an edge.
    fn infinite(&self) -> Self::Weight;

    fn add(&self, a: Self::Weight, b: Self::Weight) -> Self::Weight;

    fn subtract(&self, a: Self::Weight, b: Self::Weight) -> Self::Weight;

    /// Scalar used to rank weights.
    fn metric(&self, weight: Self::Weight) -> f32;

    /// Weight covering `fraction` of an edge of weight `weight`.
    fn scale(&self, weight: Self::Weight, fraction: f32) -> Self::Weight;

    /// Weight and direction of an edge of `distance` under `factor`.
    fn calculate(&self, factor: &Factor, distance: f32) -> (Self::Weight, Option<bool>);

    /// Number of payload words used by one encoded weight.
    fn size(&self) -> usize;

    fn encode(&self, weight: Self::Weight, words: &mut [u32]);

    fn decode(&self, words: &[u32]) -> Self::Weight;

    /// Rejects weights that cannot be stored on an edge.
    fn validate(&self, weight: Self::Weight) -> Result<()>;

    fn is_smaller(&self, weight: Self::Weight, cap: Self::Weight) -> bool {
        self.metric(weight) < self.metric(cap)
    }

    /// Empty graph with this handler's payload layout.
    fn create_graph(&self) -> DirectedGraph {
        DirectedGraph::new(1 + self.size(), 1)
    }

    fn get_edge_weight(&self, edge: &EdgeRef<'_>) -> (Self::Weight, Option<bool>) {
        let data = edge.data();
        (self.decode(&data[1..]), decode_direction(data[0]))
    }

    fn get_edge(&self, edge: &EdgeRef<'_>) -> EdgeData<Self::Weight> {
        let (weight, direction) = self.get_edge_weight(edge);
        EdgeData {
            weight,
            direction,
            contracted_id: edge.meta()[0],
        }
    }

    /// Stores one edge at `from`. Searches and contraction expect the same
    /// edge at `to` as well, with [`reverse_direction`] applied.
    fn add_edge(
        &self,
        graph: &mut DirectedGraph,
        from: Vertex,
        to: Vertex,
        weight: Self::Weight,
        direction: Option<bool>,
        contracted_id: Vertex,
    ) -> Result<EdgeId> {
        self.validate(weight)?;
        let mut data = vec![0u32; 1 + self.size()];
        data[0] = encode_direction(direction);
        self.encode(weight, &mut data[1..]);
        graph.add_edge(from, to, &data, &[contracted_id])
    }

    /// Adds `from -> to` unless an existing edge is already at least as good
    /// in every direction the candidate allows.
    ///
    /// The best forward and best backward weights over the existing edges and
    /// the candidate are kept; on equal weights the existing edge wins. When
    /// anything improved, all `from -> to` edges are replaced by one edge
    /// (forward and backward identical) or a forward-only plus a
    /// backward-only edge. Returns whether the graph changed.
    fn add_or_update_edge(
        &self,
        graph: &mut DirectedGraph,
        from: Vertex,
        to: Vertex,
        direction: Option<bool>,
        weight: Self::Weight,
        contracted_id: Vertex,
    ) -> Result<bool> {
        self.validate(weight)?;

        let mut forward: Option<(Self::Weight, Vertex)> = None;
        let mut backward: Option<(Self::Weight, Vertex)> = None;
        for edge in graph.edges(from).filter(|e| e.neighbour() == to) {
            let existing = self.get_edge(&edge);
            if forward_allowed(existing.direction)
                && forward.map_or(true, |(w, _)| self.is_smaller(existing.weight, w))
            {
                forward = Some((existing.weight, existing.contracted_id));
            }
            if backward_allowed(existing.direction)
                && backward.map_or(true, |(w, _)| self.is_smaller(existing.weight, w))
            {
                backward = Some((existing.weight, existing.contracted_id));
            }
        }

        let mut improved = false;
        if forward_allowed(direction) && forward.map_or(true, |(w, _)| self.is_smaller(weight, w)) {
            forward = Some((weight, contracted_id));
            improved = true;
        }
        if backward_allowed(direction) && backward.map_or(true, |(w, _)| self.is_smaller(weight, w))
        {
            backward = Some((weight, contracted_id));
            improved = true;
        }
        if !improved {
            return Ok(false);
        }

        graph.remove_edge(from, to);
        match (forward, backward) {
            (Some(f), Some(b)) if f == b => {
                self.add_edge(graph, from, to, f.0, None, f.1)?;
            }
            _ => {
                if let Some((w, c)) = forward {
                    self.add_edge(graph, from, to, w, Some(true), c)?;
                }
                if let Some((w, c)) = backward {
                    self.add_edge(graph, from, to, w, Some(false), c)?;
                }
            }
        }
        Ok(true)
    }

    /// Compresses `graph`, optionally dropping original edges of zero weight.
    ///
    /// Shortcuts are never dropped: a zero-weight shortcut still carries the
    /// chain needed for unpacking.
    fn compress(&self, graph: &mut DirectedGraph, remove_zero_weight: bool) {
        if !remove_zero_weight {
            graph.compress();
            return;
        }
        let zero = self.metric(self.zero());
        graph.compress_retaining(|edge| {
            let data = self.get_edge(edge);
            data.is_shortcut() || self.metric(data.weight) != zero
        });
    }

    /// Fails unless every edge `u -> w` has a copy `w -> u` with the same
    /// weight and contracted id and the reversed direction.
    fn check_mirrored(&self, graph: &DirectedGraph) -> Result<()> {
        for from in 0..graph.vertex_count() as Vertex {
            for edge in graph.edges(from) {
                let data = self.get_edge(&edge);
                let to = edge.neighbour();
                let mirrored = graph.edges(to).any(|back| {
                    back.neighbour() == from
                        && self.get_edge(&back)
                            == EdgeData {
                                direction: reverse_direction(data.direction),
                                ..data
                            }
                });
                if !mirrored {
                    return Err(ChError::Corrupt(format!(
                        "edge {from} -> {to} is not stored at {to}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Plain scalar weight: `distance * factor.value`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultWeightHandler;

impl WeightHandler for DefaultWeightHandler {
    type Weight = f32;

    fn zero(&self) -> f32 {
        0.0
    }

    fn infinite(&self) -> f32 {
        f32::MAX
    }

    fn add(&self, a: f32, b: f32) -> f32 {
        a + b
    }

    fn subtract(&self, a: f32, b: f32) -> f32 {
        a - b
    }

    fn metric(&self, weight: f32) -> f32 {
        weight
    }

    fn scale(&self, weight: f32, fraction: f32) -> f32 {
        weight * fraction
    }

    fn calculate(&self, factor: &Factor, distance: f32) -> (f32, Option<bool>) {
        (distance * factor.value, factor.direction)
    }

    fn size(&self) -> usize {
        1
    }

    fn encode(&self, weight: f32, words: &mut [u32]) {
        words[0] = weight.to_bits();
    }

    fn decode(&self, words: &[u32]) -> f32 {
        f32::from_bits(words[0])
    }

    fn validate(&self, weight: f32) -> Result<()> {
        if !weight.is_finite() || weight == f32::MAX {
            Err(ChError::InvalidWeight(weight))
        } else if weight < 0.0 {
            Err(ChError::NegativeWeight(weight))
        } else {
            Ok(())
        }
    }
}
