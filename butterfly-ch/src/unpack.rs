//! Shortcut unpacking - expand hierarchy edges to original edges

use crate::error::{ChError, Result};
use crate::graph::{backward_allowed, forward_allowed, DirectedGraph, Vertex, NO_VERTEX};
use crate::weight::{EdgeData, WeightHandler};

/// Lightest edge that can be travelled from `from` to `to`.
///
/// The edge is either stored at `from` and traversable forward, or stored
/// at `to` and traversable backward; a contracted graph keeps each edge
/// only at its lower endpoint.
pub fn find_traversal_edge<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    from: Vertex,
    to: Vertex,
) -> Option<EdgeData<H::Weight>> {
    let stored_at_from = graph
        .edges(from)
        .filter(|e| e.neighbour() == to)
        .map(|e| handler.get_edge(&e))
        .filter(|d| forward_allowed(d.direction));
    let stored_at_to = graph
        .edges(to)
        .filter(|e| e.neighbour() == from)
        .map(|e| handler.get_edge(&e))
        .filter(|d| backward_allowed(d.direction));

    stored_at_from
        .chain(stored_at_to)
        .fold(None, |best: Option<EdgeData<H::Weight>>, d| match best {
            Some(b) if !handler.is_smaller(d.weight, b.weight) => Some(b),
            _ => Some(d),
        })
}

/// Expands every shortcut along `vertices` into the original vertex
/// sequence. The first vertex is kept as is.
pub fn unpack_path<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    vertices: &[Vertex],
) -> Result<Vec<Vertex>> {
    let Some(&first) = vertices.first() else {
        return Ok(Vec::new());
    };
    let mut result = vec![first];
    for pair in vertices.windows(2) {
        unpack_edge(graph, handler, pair[0], pair[1], &mut result)?;
    }
    Ok(result)
}

/// Appends the original vertices after `from` on the way to `to`.
pub fn unpack_edge<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    from: Vertex,
    to: Vertex,
    out: &mut Vec<Vertex>,
) -> Result<()> {
    let edge = find_traversal_edge(graph, handler, from, to).ok_or_else(|| {
        ChError::Corrupt(format!("no traversable edge {from} -> {to} to unpack"))
    })?;

    if edge.contracted_id == NO_VERTEX {
        out.push(to);
        return Ok(());
    }

    let middle = edge.contracted_id;
    if middle == from || middle == to {
        return Err(ChError::Corrupt(format!(
            "shortcut {from} -> {to} is contracted through one of its endpoints"
        )));
    }
    tracing::trace!(from, middle, to, "unpacking shortcut");
    unpack_edge(graph, handler, from, middle, out)?;
    unpack_edge(graph, handler, middle, to, out)
}
