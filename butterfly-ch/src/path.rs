//! Search tree nodes
//!
//! Each search owns a [`PathTree`], an append-only arena of [`EdgePath`]
//! nodes. A node links to its parent by [`PathId`], so reconstructing a path
//! walks indices inside one tree and never shares nodes between trees.

use crate::graph::{EdgeId, Vertex};

/// Index of a node inside its [`PathTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathId(u32);

impl PathId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Encodes a traversed edge id: `id + 1` when traversed along its stored
/// orientation, `-(id + 1)` against it. Zero is reserved for roots.
pub fn encode_edge(id: EdgeId, forward: bool) -> i64 {
    let code = id as i64 + 1;
    if forward {
        code
    } else {
        -code
    }
}

/// Inverse of [`encode_edge`]; `None` for roots.
pub fn decode_edge(code: i64) -> Option<(EdgeId, bool)> {
    match code {
        0 => None,
        c if c > 0 => Some(((c - 1) as EdgeId, true)),
        c => Some(((-c - 1) as EdgeId, false)),
    }
}

/// One settled search state: the vertex reached, the accumulated weight and
/// the edge used to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath<W> {
    pub vertex: Vertex,
    pub weight: W,
    pub edge: i64,
    from: Option<PathId>,
}

impl<W> EdgePath<W> {
    /// Search origin. A non-zero weight models starting part-way along an
    /// edge.
    pub fn root(vertex: Vertex, weight: W) -> Self {
        Self {
            vertex,
            weight,
            edge: 0,
            from: None,
        }
    }

    /// Unlinked node; it gains a parent only through [`PathTree::push_child`].
    pub fn new(vertex: Vertex, weight: W, edge: i64) -> Self {
        Self {
            vertex,
            weight,
            edge,
            from: None,
        }
    }

    pub fn from(&self) -> Option<PathId> {
        self.from
    }

    pub fn is_root(&self) -> bool {
        self.from.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct PathTree<W> {
    nodes: Vec<EdgePath<W>>,
}

impl<W> Default for PathTree<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> PathTree<W> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node without a parent.
    pub fn push(&mut self, path: EdgePath<W>) -> PathId {
        let id = PathId(self.nodes.len() as u32);
        self.nodes.push(EdgePath { from: None, ..path });
        id
    }

    /// Adds a node reached from `parent` over `edge`.
    pub fn push_child(&mut self, parent: PathId, vertex: Vertex, weight: W, edge: i64) -> PathId {
        let id = PathId(self.nodes.len() as u32);
        self.nodes.push(EdgePath {
            vertex,
            weight,
            edge,
            from: Some(parent),
        });
        id
    }

    pub fn get(&self, id: PathId) -> &EdgePath<W> {
        &self.nodes[id.index()]
    }

    pub fn parent(&self, id: PathId) -> Option<&EdgePath<W>> {
        self.get(id).from.map(|p| self.get(p))
    }

    /// Nodes from `id` back to its root, `id` first.
    pub fn chain(&self, id: PathId) -> Chain<'_, W> {
        Chain {
            tree: self,
            next: Some(id),
        }
    }

    /// Vertices from the root to `id`.
    pub fn vertices(&self, id: PathId) -> Vec<Vertex> {
        let mut vertices: Vec<_> = self.chain(id).map(|p| p.vertex).collect();
        vertices.reverse();
        vertices
    }
}

pub struct Chain<'a, W> {
    tree: &'a PathTree<W>,
    next: Option<PathId>,
}

impl<'a, W> Iterator for Chain<'a, W> {
    type Item = &'a EdgePath<W>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tree.get(self.next?);
        self.next = node.from;
        Some(node)
    }
}
