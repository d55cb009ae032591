//! Directed multigraph with fixed-size edge payloads
//!
//! Every vertex owns a block of edge slots inside one flat `u32` buffer.
//! A slot holds the neighbour followed by `edge_data_size` payload words;
//! a parallel buffer holds `meta_size` words per slot. When a block is full
//! it is moved to the end of the buffer with twice the capacity, leaving the
//! old slots as garbage until the next [`DirectedGraph::compress`].
//!
//! The slot index doubles as the edge id. Ids are stable until the next
//! mutation of the owning vertex (removal swaps the last edge into the gap,
//! relocation and compression renumber the whole block).

use serde::{Deserialize, Serialize};

use crate::error::{ChError, Result};

pub type Vertex = u32;
pub type EdgeId = u32;

/// Sentinel for "no vertex": original edges, unset parents, failed queries.
pub const NO_VERTEX: Vertex = u32::MAX;

const INITIAL_BLOCK: u32 = 4;

/// True when an edge with this direction can be traversed from its stored
/// `from` towards its `to`.
#[inline]
pub fn forward_allowed(direction: Option<bool>) -> bool {
    direction != Some(false)
}

/// True when an edge with this direction can be traversed from its stored
/// `to` back towards its `from`.
#[inline]
pub fn backward_allowed(direction: Option<bool>) -> bool {
    direction != Some(true)
}

/// Direction of the same edge stored at its other endpoint.
#[inline]
pub fn reverse_direction(direction: Option<bool>) -> Option<bool> {
    direction.map(|forward| !forward)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Block {
    start: u32,
    len: u32,
    cap: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedGraph {
    edge_data_size: usize,
    meta_size: usize,
    blocks: Vec<Block>,
    slots: Vec<u32>,
    meta: Vec<u32>,
    edge_count: usize,
}

/// Borrowed view of one stored edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRef<'a> {
    id: EdgeId,
    from: Vertex,
    neighbour: Vertex,
    data: &'a [u32],
    meta: &'a [u32],
}

impl<'a> EdgeRef<'a> {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Vertex whose adjacency holds this edge.
    pub fn from(&self) -> Vertex {
        self.from
    }

    pub fn neighbour(&self) -> Vertex {
        self.neighbour
    }

    pub fn data(&self) -> &'a [u32] {
        self.data
    }

    pub fn meta(&self) -> &'a [u32] {
        self.meta
    }
}

impl DirectedGraph {
    pub fn new(edge_data_size: usize, meta_size: usize) -> Self {
        Self {
            edge_data_size,
            meta_size,
            blocks: Vec::new(),
            slots: Vec::new(),
            meta: Vec::new(),
            edge_count: 0,
        }
    }

    pub fn edge_data_size(&self) -> usize {
        self.edge_data_size
    }

    pub fn meta_size(&self) -> usize {
        self.meta_size
    }

    pub fn vertex_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn stride(&self) -> usize {
        1 + self.edge_data_size
    }

    fn slot_count(&self) -> usize {
        self.slots.len() / self.stride()
    }

    /// Grows the vertex space so that `0..count` are valid vertices.
    pub fn ensure_vertices(&mut self, count: usize) {
        if self.blocks.len() < count {
            self.blocks.resize(count, Block::default());
        }
    }

    /// Fails unless `vertex` is inside the vertex space.
    pub fn check_vertex(&self, vertex: Vertex) -> Result<()> {
        if (vertex as usize) < self.blocks.len() {
            Ok(())
        } else {
            Err(ChError::VertexOutOfBounds {
                vertex,
                vertex_count: self.blocks.len(),
            })
        }
    }

    /// Appends an edge at `from`. The vertex space grows to include both
    /// endpoints. Only `from` is touched: routing graphs also store the edge
    /// at `to`, see [`crate::WeightHandler::add_edge`].
    pub fn add_edge(
        &mut self,
        from: Vertex,
        to: Vertex,
        data: &[u32],
        meta: &[u32],
    ) -> Result<EdgeId> {
        if from == NO_VERTEX || to == NO_VERTEX {
            return Err(ChError::VertexOutOfBounds {
                vertex: NO_VERTEX,
                vertex_count: self.blocks.len(),
            });
        }
        if data.len() != self.edge_data_size {
            return Err(ChError::PayloadSize {
                expected: self.edge_data_size,
                actual: data.len(),
            });
        }
        if meta.len() != self.meta_size {
            return Err(ChError::PayloadSize {
                expected: self.meta_size,
                actual: meta.len(),
            });
        }
        self.ensure_vertices(from.max(to) as usize + 1);

        let block = self.blocks[from as usize];
        let block = if block.len == block.cap {
            self.grow_block(from, block)
        } else {
            block
        };

        let slot = (block.start + block.len) as usize;
        let stride = self.stride();
        self.slots[slot * stride] = to;
        self.slots[slot * stride + 1..(slot + 1) * stride].copy_from_slice(data);
        self.meta[slot * self.meta_size..(slot + 1) * self.meta_size].copy_from_slice(meta);

        self.blocks[from as usize].len += 1;
        self.edge_count += 1;
        Ok(slot as EdgeId)
    }

    fn grow_block(&mut self, vertex: Vertex, block: Block) -> Block {
        let new_cap = (block.cap * 2).max(INITIAL_BLOCK);
        let stride = self.stride();
        let slot_count = self.slot_count();

        let grown = if block.cap > 0 && (block.start + block.cap) as usize == slot_count {
            // Last block in the buffer: extend in place.
            Block { cap: new_cap, ..block }
        } else {
            let start = slot_count as u32;
            for i in 0..block.len as usize {
                let old = block.start as usize + i;
                let (s, m) = (old * stride, old * self.meta_size);
                self.slots.extend_from_within(s..s + stride);
                self.meta.extend_from_within(m..m + self.meta_size);
            }
            Block {
                start,
                len: block.len,
                cap: new_cap,
            }
        };

        let end = (grown.start + grown.cap) as usize;
        self.slots.resize(end * stride, 0);
        self.meta.resize(end * self.meta_size, 0);
        self.blocks[vertex as usize] = grown;
        grown
    }

    fn edge_at(&self, from: Vertex, slot: usize) -> EdgeRef<'_> {
        let stride = self.stride();
        EdgeRef {
            id: slot as EdgeId,
            from,
            neighbour: self.slots[slot * stride],
            data: &self.slots[slot * stride + 1..(slot + 1) * stride],
            meta: &self.meta[slot * self.meta_size..(slot + 1) * self.meta_size],
        }
    }

    /// Outgoing edges stored at `vertex`. Unknown vertices have none.
    pub fn edges(&self, vertex: Vertex) -> Edges<'_> {
        let block = self.blocks.get(vertex as usize).copied().unwrap_or_default();
        Edges {
            graph: self,
            vertex,
            next: block.start as usize,
            end: (block.start + block.len) as usize,
        }
    }

    /// Looks up an edge by id, provided it still belongs to `from`.
    pub fn edge(&self, from: Vertex, id: EdgeId) -> Option<EdgeRef<'_>> {
        let block = self.blocks.get(from as usize)?;
        let slot = id as usize;
        if slot >= block.start as usize && slot < (block.start + block.len) as usize {
            Some(self.edge_at(from, slot))
        } else {
            None
        }
    }

    fn swap_remove_slot(&mut self, from: Vertex, slot: usize) {
        let block = &mut self.blocks[from as usize];
        let last = (block.start + block.len - 1) as usize;
        block.len -= 1;
        if slot != last {
            let stride = 1 + self.edge_data_size;
            self.slots.copy_within(last * stride..(last + 1) * stride, slot * stride);
            let m = self.meta_size;
            self.meta.copy_within(last * m..(last + 1) * m, slot * m);
        }
        self.edge_count -= 1;
    }

    /// Removes every edge stored at `from` whose neighbour is `to`.
    pub fn remove_edge(&mut self, from: Vertex, to: Vertex) -> usize {
        self.remove_edges_where(from, |edge| edge.neighbour() == to)
    }

    /// Removes every edge stored at `vertex`.
    pub fn remove_edges(&mut self, vertex: Vertex) -> usize {
        self.remove_edges_where(vertex, |_| true)
    }

    /// Removes the edges stored at `from` matching `predicate`.
    pub fn remove_edges_where<F>(&mut self, from: Vertex, mut predicate: F) -> usize
    where
        F: FnMut(&EdgeRef<'_>) -> bool,
    {
        let Some(block) = self.blocks.get(from as usize).copied() else {
            return 0;
        };
        let mut removed = 0;
        let mut slot = block.start as usize;
        let mut end = (block.start + block.len) as usize;
        while slot < end {
            if predicate(&self.edge_at(from, slot)) {
                self.swap_remove_slot(from, slot);
                end -= 1;
                removed += 1;
            } else {
                slot += 1;
            }
        }
        removed
    }

    /// Defragments storage, sorts each adjacency by neighbour and drops exact
    /// duplicate edges.
    pub fn compress(&mut self) {
        self.compress_retaining(|_| true);
    }

    /// Like [`compress`](Self::compress), also dropping edges for which `keep`
    /// returns false.
    pub fn compress_retaining<F>(&mut self, mut keep: F)
    where
        F: FnMut(&EdgeRef<'_>) -> bool,
    {
        let stride = self.stride();
        let mut slots = Vec::with_capacity(self.edge_count * stride);
        let mut meta = Vec::with_capacity(self.edge_count * self.meta_size);
        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut edge_count = 0;
        let mut records: Vec<Vec<u32>> = Vec::new();

        for vertex in 0..self.blocks.len() as Vertex {
            records.clear();
            for edge in self.edges(vertex) {
                if !keep(&edge) {
                    continue;
                }
                let mut record = Vec::with_capacity(stride + self.meta_size);
                record.push(edge.neighbour());
                record.extend_from_slice(edge.data());
                record.extend_from_slice(edge.meta());
                records.push(record);
            }
            records.sort_unstable();
            records.dedup();

            let start = (slots.len() / stride) as u32;
            for record in &records {
                slots.extend_from_slice(&record[..stride]);
                meta.extend_from_slice(&record[stride..]);
            }
            let len = records.len() as u32;
            blocks.push(Block { start, len, cap: len });
            edge_count += records.len();
        }

        self.slots = slots;
        self.meta = meta;
        self.blocks = blocks;
        self.edge_count = edge_count;
    }
}

/// Iterator over the edges stored at one vertex.
pub struct Edges<'a> {
    graph: &'a DirectedGraph,
    vertex: Vertex,
    next: usize,
    end: usize,
}

impl<'a> Iterator for Edges<'a> {
    type Item = EdgeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let edge = self.graph.edge_at(self.vertex, self.next);
        self.next += 1;
        Some(edge)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Edges<'_> {}
