//! Road network boundary
//!
//! The network layer hands over road segments and a profile that turns a
//! segment's profile id into a cost factor. The core evaluates each factor
//! once, when the graph is built, and turns router points (positions along
//! a segment) into search roots.

use serde::{Deserialize, Serialize};

use crate::error::{ChError, Result};
use crate::graph::{reverse_direction, DirectedGraph, Vertex, NO_VERTEX};
use crate::path::EdgePath;
use crate::weight::WeightHandler;

/// Cost of travelling a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// Cost per unit of distance; zero means no access.
    pub value: f32,
    /// Distance per unit of time.
    #[serde(default = "default_speed")]
    pub speed: f32,
    /// `None` both ways, `Some(true)` only along the segment, `Some(false)`
    /// only against it.
    #[serde(default)]
    pub direction: Option<bool>,
}

fn default_speed() -> f32 {
    1.0
}

impl Factor {
    pub const NO_ACCESS: Factor = Factor {
        value: 0.0,
        speed: 0.0,
        direction: None,
    };

    pub fn new(value: f32, direction: Option<bool>) -> Self {
        Self {
            value,
            speed: default_speed(),
            direction,
        }
    }

    pub fn is_accessible(&self) -> bool {
        self.value > 0.0
    }

    /// Whether the segment can be travelled along (`forward`) or against
    /// its stored orientation.
    pub fn allows(&self, forward: bool) -> bool {
        self.is_accessible() && self.direction.map_or(true, |d| d == forward)
    }
}

pub trait Profile {
    fn factor(&self, profile_id: u32) -> Factor;
}

/// The same factor for every segment.
impl Profile for Factor {
    fn factor(&self, _profile_id: u32) -> Factor {
        *self
    }
}

/// Factors indexed by profile id; unknown ids have no access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    factors: Vec<Factor>,
}

impl TableProfile {
    pub fn new(factors: Vec<Factor>) -> Self {
        Self { factors }
    }
}

impl Profile for TableProfile {
    fn factor(&self, profile_id: u32) -> Factor {
        self.factors
            .get(profile_id as usize)
            .copied()
            .unwrap_or(Factor::NO_ACCESS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadSegment {
    pub from: Vertex,
    pub to: Vertex,
    pub distance: f32,
    pub profile: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadNetwork {
    segments: Vec<RoadSegment>,
}

impl RoadNetwork {
    pub fn new(segments: Vec<RoadSegment>) -> Self {
        Self { segments }
    }

    /// Appends a segment and returns its edge id.
    pub fn add_segment(&mut self, from: Vertex, to: Vertex, distance: f32, profile: u32) -> u32 {
        self.segments.push(RoadSegment {
            from,
            to,
            distance,
            profile,
        });
        (self.segments.len() - 1) as u32
    }

    pub fn segments(&self) -> &[RoadSegment] {
        &self.segments
    }

    pub fn segment(&self, edge_id: u32) -> Result<&RoadSegment> {
        self.segments
            .get(edge_id as usize)
            .ok_or(ChError::EdgeOutOfBounds {
                edge: edge_id,
                edge_count: self.segments.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// One past the highest vertex referenced by any segment.
    pub fn vertex_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.from.max(s.to) as usize + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Builds the routing graph: each accessible segment is stored at both
/// endpoints, mirrored at `to`. Self loops are skipped.
pub fn build_graph<H: WeightHandler, P: Profile>(
    network: &RoadNetwork,
    profile: &P,
    handler: H,
) -> Result<DirectedGraph> {
    let mut graph = handler.create_graph();
    graph.ensure_vertices(network.vertex_count());

    let mut skipped = 0usize;
    for segment in network.segments() {
        let factor = profile.factor(segment.profile);
        if !factor.is_accessible() || segment.from == segment.to {
            skipped += 1;
            continue;
        }
        let (weight, direction) = handler.calculate(&factor, segment.distance);
        handler.add_edge(&mut graph, segment.from, segment.to, weight, direction, NO_VERTEX)?;
        handler.add_edge(
            &mut graph,
            segment.to,
            segment.from,
            weight,
            reverse_direction(direction),
            NO_VERTEX,
        )?;
    }
    handler.compress(&mut graph, false);

    tracing::info!(
        segments = network.len(),
        skipped,
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "routing graph built"
    );
    Ok(graph)
}

fn segment_weight<H: WeightHandler, P: Profile>(
    network: &RoadNetwork,
    profile: &P,
    handler: H,
    edge_id: u32,
) -> Result<(RoadSegment, Factor, H::Weight)> {
    let segment = *network.segment(edge_id)?;
    let factor = profile.factor(segment.profile);
    let (weight, _) = handler.calculate(&factor, segment.distance);
    Ok((segment, factor, weight))
}

/// A location resolved onto a segment: `offset` is the fraction of the way
/// from the segment's `from` to its `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouterPoint {
    pub edge_id: u32,
    pub offset: f32,
}

impl RouterPoint {
    pub fn new(edge_id: u32, offset: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&offset) {
            return Err(ChError::InvalidOffset(offset));
        }
        Ok(Self { edge_id, offset })
    }

    /// Search roots at the segment endpoints, each weighted with the part
    /// of the segment between the point and that endpoint. As a source the
    /// part is travelled away from the point, as a target towards it; parts
    /// the profile does not allow are left out.
    pub fn to_edge_paths<H: WeightHandler, P: Profile>(
        &self,
        network: &RoadNetwork,
        profile: &P,
        handler: H,
        as_target: bool,
    ) -> Result<Vec<EdgePath<H::Weight>>> {
        if !(0.0..=1.0).contains(&self.offset) {
            return Err(ChError::InvalidOffset(self.offset));
        }
        let (segment, factor, weight) = segment_weight(network, profile, handler, self.edge_id)?;
        if !factor.is_accessible() {
            return Ok(Vec::new());
        }
        if self.offset == 0.0 {
            return Ok(vec![EdgePath::root(segment.from, handler.zero())]);
        }
        if self.offset == 1.0 {
            return Ok(vec![EdgePath::root(segment.to, handler.zero())]);
        }

        let to_from = handler.scale(weight, self.offset);
        let to_to = handler.subtract(weight, to_from);
        let mut paths = Vec::with_capacity(2);
        // Source: leave towards `to` along the segment. Target: arrive from
        // `to`, travelling against it.
        if factor.allows(!as_target) {
            paths.push(EdgePath::root(segment.to, to_to));
        }
        if factor.allows(as_target) {
            paths.push(EdgePath::root(segment.from, to_from));
        }
        Ok(paths)
    }
}

/// A segment travelled in one orientation: `forward` is along `from -> to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedEdgeId {
    pub edge_id: u32,
    pub forward: bool,
}

impl DirectedEdgeId {
    pub fn new(edge_id: u32, forward: bool) -> Self {
        Self { edge_id, forward }
    }

    /// Root for leaving over the whole segment: at its head, carrying the
    /// segment weight. `None` when the profile forbids this orientation.
    pub fn source_path<H: WeightHandler, P: Profile>(
        &self,
        network: &RoadNetwork,
        profile: &P,
        handler: H,
    ) -> Result<Option<EdgePath<H::Weight>>> {
        let (segment, factor, weight) = segment_weight(network, profile, handler, self.edge_id)?;
        if !factor.allows(self.forward) {
            return Ok(None);
        }
        let head = if self.forward { segment.to } else { segment.from };
        Ok(Some(EdgePath::root(head, weight)))
    }

    /// Root for arriving over the whole segment: at its tail, carrying the
    /// segment weight. `None` when the profile forbids this orientation.
    pub fn target_path<H: WeightHandler, P: Profile>(
        &self,
        network: &RoadNetwork,
        profile: &P,
        handler: H,
    ) -> Result<Option<EdgePath<H::Weight>>> {
        let (segment, factor, weight) = segment_weight(network, profile, handler, self.edge_id)?;
        if !factor.allows(self.forward) {
            return Ok(None);
        }
        let tail = if self.forward { segment.from } else { segment.to };
        Ok(Some(EdgePath::root(tail, weight)))
    }
}
