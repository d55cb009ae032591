//! Many-to-many weight matrices
//!
//! One forward tree per source and one backward tree per target, joined
//! through buckets: every forward settle is filed under its vertex, then
//! each backward settle looks up the forward entries of the same vertex.
//! Trees are independent and computed in parallel.

use rayon::prelude::*;

use crate::dykstra::Dykstra;
use crate::error::Result;
use crate::graph::{DirectedGraph, Vertex};
use crate::network::{DirectedEdgeId, Profile, RoadNetwork, RouterPoint};
use crate::path::EdgePath;
use crate::weight::WeightHandler;
use crate::RunState;

/// Forward settles sorted by vertex for binary-search lookup.
pub struct SortedBuckets<W> {
    // (vertex, source index, weight)
    items: Vec<(Vertex, u32, W)>,
}

impl<W: Copy> Default for SortedBuckets<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Copy> SortedBuckets<W> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn add(&mut self, vertex: Vertex, source: u32, weight: W) {
        self.items.push((vertex, source, weight));
    }

    pub fn sort(&mut self) {
        self.items.sort_unstable_by_key(|&(vertex, source, _)| (vertex, source));
    }

    /// All entries for `vertex`; requires [`sort`](Self::sort) first.
    pub fn get(&self, vertex: Vertex) -> &[(Vertex, u32, W)] {
        let start = self.items.partition_point(|(v, _, _)| *v < vertex);
        let end = self.items[start..].partition_point(|(v, _, _)| *v == vertex) + start;
        &self.items[start..end]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct ManyToManyWeights<'a, H: WeightHandler> {
    graph: &'a DirectedGraph,
    handler: H,
    sources: Vec<Vec<EdgePath<H::Weight>>>,
    targets: Vec<Vec<EdgePath<H::Weight>>>,
    max_settles: Option<usize>,
    state: RunState,
    weights: Vec<Vec<H::Weight>>,
}

impl<'a, H: WeightHandler> ManyToManyWeights<'a, H> {
    /// One root set per source and per target. Fails when a root lies
    /// outside the graph.
    pub fn new(
        graph: &'a DirectedGraph,
        handler: H,
        sources: Vec<Vec<EdgePath<H::Weight>>>,
        targets: Vec<Vec<EdgePath<H::Weight>>>,
    ) -> Result<Self> {
        for root in sources.iter().chain(&targets).flatten() {
            graph.check_vertex(root.vertex)?;
        }
        Ok(Self {
            graph,
            handler,
            sources,
            targets,
            max_settles: None,
            state: RunState::NotRun,
            weights: Vec::new(),
        })
    }

    pub fn from_vertices(
        graph: &'a DirectedGraph,
        handler: H,
        sources: &[Vertex],
        targets: &[Vertex],
    ) -> Result<Self> {
        let roots = |vertices: &[Vertex]| -> Vec<Vec<EdgePath<H::Weight>>> {
            vertices
                .iter()
                .map(|&v| vec![EdgePath::root(v, handler.zero())])
                .collect()
        };
        Self::new(graph, handler, roots(sources), roots(targets))
    }

    /// Sources and targets given as directed network edges. A direction the
    /// profile forbids yields an empty root set and an infinite row or
    /// column.
    pub fn from_directed_edges<P: Profile>(
        graph: &'a DirectedGraph,
        handler: H,
        network: &RoadNetwork,
        profile: &P,
        sources: &[DirectedEdgeId],
        targets: &[DirectedEdgeId],
    ) -> Result<Self> {
        let sources = sources
            .iter()
            .map(|e| -> Result<Vec<_>> {
                Ok(e.source_path(network, profile, handler)?.into_iter().collect())
            })
            .collect::<Result<Vec<_>>>()?;
        let targets = targets
            .iter()
            .map(|e| -> Result<Vec<_>> {
                Ok(e.target_path(network, profile, handler)?.into_iter().collect())
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(graph, handler, sources, targets)
    }

    pub fn from_router_points<P: Profile>(
        graph: &'a DirectedGraph,
        handler: H,
        network: &RoadNetwork,
        profile: &P,
        sources: &[RouterPoint],
        targets: &[RouterPoint],
    ) -> Result<Self> {
        let seed = |points: &[RouterPoint], as_target: bool| {
            points
                .iter()
                .map(|p| p.to_edge_paths(network, profile, handler, as_target))
                .collect::<Result<Vec<_>>>()
        };
        Self::new(graph, handler, seed(sources, false)?, seed(targets, true)?)
    }

    pub fn with_max_settles(mut self, max_settles: Option<usize>) -> Self {
        self.max_settles = max_settles;
        self
    }

    pub fn has_run(&self) -> bool {
        self.state.has_run()
    }

    pub fn has_succeeded(&self) -> bool {
        self.state.has_succeeded()
    }

    /// `weights()[i][j]` is the weight from source `i` to target `j`, or the
    /// handler's infinite weight when unreachable. Empty before a run.
    pub fn weights(&self) -> &[Vec<H::Weight>] {
        &self.weights
    }

    pub fn run(&mut self) -> Result<()> {
        self.state.start()?;
        match self.compute() {
            Ok(weights) => {
                self.weights = weights;
                self.state = RunState::Succeeded;
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    fn tree(
        &self,
        roots: &[EdgePath<H::Weight>],
        backward: bool,
    ) -> Result<Vec<(Vertex, H::Weight)>> {
        let mut dykstra = Dykstra::new(self.graph, self.handler, roots.to_vec(), backward)?
            .with_max_settles(self.max_settles);
        dykstra.run()?;
        Ok(dykstra.visits().map(|(v, p)| (v, p.weight)).collect())
    }

    fn compute(&self) -> Result<Vec<Vec<H::Weight>>> {
        let handler = self.handler;
        let forward = self
            .sources
            .par_iter()
            .map(|roots| self.tree(roots, false))
            .collect::<Result<Vec<_>>>()?;

        let mut buckets = SortedBuckets::new();
        for (i, settled) in forward.iter().enumerate() {
            for &(vertex, weight) in settled {
                buckets.add(vertex, i as u32, weight);
            }
        }
        buckets.sort();

        let n = self.sources.len();
        let columns = self
            .targets
            .par_iter()
            .map(|roots| -> Result<Vec<H::Weight>> {
                let settled = self.tree(roots, true)?;
                let mut column = vec![handler.infinite(); n];
                for (vertex, backward) in settled {
                    for &(_, i, forward) in buckets.get(vertex) {
                        let total = handler.add(forward, backward);
                        if handler.is_smaller(total, column[i as usize]) {
                            column[i as usize] = total;
                        }
                    }
                }
                Ok(column)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            sources = n,
            targets = columns.len(),
            bucket_entries = buckets.len(),
            "many-to-many weights computed"
        );

        let mut weights = vec![vec![handler.infinite(); columns.len()]; n];
        for (j, column) in columns.iter().enumerate() {
            for (i, &w) in column.iter().enumerate() {
                weights[i][j] = w;
            }
        }
        Ok(weights)
    }
}
