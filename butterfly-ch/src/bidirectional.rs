//! Point-to-point queries on a contracted graph
//!
//! A forward tree grows from the source roots and a backward tree from the
//! target roots. Both only climb the hierarchy, so the best route passes
//! through the settled vertex minimising forward + backward weight.

use crate::dykstra::Dykstra;
use crate::error::Result;
use crate::graph::{DirectedGraph, Vertex};
use crate::network::{Profile, RoadNetwork, RouterPoint};
use crate::path::EdgePath;
use crate::unpack::unpack_path;
use crate::weight::WeightHandler;
use crate::RunState;

pub struct BidirectionalDykstra<'a, H: WeightHandler> {
    graph: &'a DirectedGraph,
    handler: H,
    forward: Dykstra<'a, H>,
    backward: Dykstra<'a, H>,
    state: RunState,
    best: Option<(Vertex, H::Weight)>,
}

impl<'a, H: WeightHandler> BidirectionalDykstra<'a, H> {
    /// Query between seeded roots. Empty root lists are allowed and simply
    /// make the query fail.
    pub fn new(
        graph: &'a DirectedGraph,
        handler: H,
        sources: Vec<EdgePath<H::Weight>>,
        targets: Vec<EdgePath<H::Weight>>,
    ) -> Result<Self> {
        Ok(Self {
            graph,
            handler,
            forward: Dykstra::new(graph, handler, sources, false)?,
            backward: Dykstra::new(graph, handler, targets, true)?,
            state: RunState::NotRun,
            best: None,
        })
    }

    pub fn from_vertices(
        graph: &'a DirectedGraph,
        handler: H,
        source: Vertex,
        target: Vertex,
    ) -> Result<Self> {
        Self::new(
            graph,
            handler,
            vec![EdgePath::root(source, handler.zero())],
            vec![EdgePath::root(target, handler.zero())],
        )
    }

    /// Query between two positions on network segments.
    pub fn from_router_points<P: Profile>(
        graph: &'a DirectedGraph,
        handler: H,
        network: &RoadNetwork,
        profile: &P,
        source: &RouterPoint,
        target: &RouterPoint,
    ) -> Result<Self> {
        Self::new(
            graph,
            handler,
            source.to_edge_paths(network, profile, handler, false)?,
            target.to_edge_paths(network, profile, handler, true)?,
        )
    }

    pub fn with_max_settles(mut self, max_settles: Option<usize>) -> Self {
        self.forward = self.forward.with_max_settles(max_settles);
        self.backward = self.backward.with_max_settles(max_settles);
        self
    }

    /// Caps the weight explored by each of the two trees.
    pub fn with_max_weight(mut self, max_weight: Option<H::Weight>) -> Self {
        self.forward = self.forward.with_max_weight(max_weight);
        self.backward = self.backward.with_max_weight(max_weight);
        self
    }

    pub fn has_run(&self) -> bool {
        self.state.has_run()
    }

    pub fn has_succeeded(&self) -> bool {
        self.state.has_succeeded()
    }

    pub fn run(&mut self) -> Result<()> {
        self.state.start()?;
        let result = self.search();
        self.state = match (&result, self.best) {
            (Ok(()), Some(_)) => RunState::Succeeded,
            _ => RunState::Failed,
        };
        result
    }

    fn search(&mut self) -> Result<()> {
        self.forward.run()?;
        self.backward.run()?;

        let handler = self.handler;
        let mut best: Option<(Vertex, H::Weight)> = None;
        for (vertex, forward) in self.forward.visits() {
            let Some(backward) = self.backward.try_get_visit(vertex) else {
                continue;
            };
            let total = handler.add(forward.weight, backward.weight);
            let better = match best {
                None => true,
                Some((v, w)) => {
                    handler.is_smaller(total, w) || (!handler.is_smaller(w, total) && vertex < v)
                }
            };
            if better {
                best = Some((vertex, total));
            }
        }
        self.best = best;
        if best.is_none() {
            tracing::debug!("no common vertex between forward and backward trees");
        }
        Ok(())
    }

    /// Meeting vertex of the best route.
    pub fn best(&self) -> Option<Vertex> {
        self.best.map(|(v, _)| v)
    }

    pub fn weight(&self) -> Option<H::Weight> {
        self.best.map(|(_, w)| w)
    }

    pub fn forward(&self) -> &Dykstra<'a, H> {
        &self.forward
    }

    pub fn backward(&self) -> &Dykstra<'a, H> {
        &self.backward
    }

    /// Route on the contracted graph: source root to target root, shortcuts
    /// not yet expanded.
    pub fn hierarchy_path(&self) -> Option<Vec<Vertex>> {
        let best = self.best()?;
        let mut path = self.forward.path_to(best)?;
        let mut down = self.backward.path_to(best)?;
        down.reverse();
        path.extend(down.into_iter().skip(1));
        Some(path)
    }

    /// Route with every shortcut expanded into original edges.
    pub fn path(&self) -> Result<Option<Vec<Vertex>>> {
        match self.hierarchy_path() {
            Some(path) => unpack_path(self.graph, self.handler, &path).map(Some),
            None => Ok(None),
        }
    }
}
