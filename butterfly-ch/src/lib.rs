//! Contraction hierarchies for the butterfly-osm routing engine
//!
//! Preprocessing builds a hierarchy of shortcut edges over a directed
//! weighted graph; queries then only ever climb that hierarchy:
//!
//! 1. [`graph::DirectedGraph`] stores per-vertex adjacency with a fixed
//!    binary payload (direction, weight words, shortcut origin).
//! 2. [`weight::WeightHandler`] encodes, decodes and combines weights, so
//!    the same algorithms run on plain and augmented weights.
//! 3. [`HierarchyBuilder`] contracts vertices in edge-difference order,
//!    using [`WitnessCalculator`] to skip redundant shortcuts.
//! 4. [`Dykstra`], [`BidirectionalDykstra`] and [`ManyToManyWeights`]
//!    answer single-source, point-to-point and matrix queries.

pub mod bidirectional;
pub mod config;
pub mod contraction;
pub mod dykstra;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod many_to_many;
pub mod network;
pub mod path;
pub mod priority;
pub mod unpack;
pub mod validate;
pub mod weight;
pub mod witness;

pub use bidirectional::BidirectionalDykstra;
pub use config::ContractionConfig;
pub use dykstra::Dykstra;
pub use error::{ChError, Result};
pub use graph::{DirectedGraph, EdgeId, Vertex, NO_VERTEX};
pub use hierarchy::{ContractionStats, HierarchyBuilder};
pub use many_to_many::ManyToManyWeights;
pub use network::{
    build_graph, DirectedEdgeId, Factor, Profile, RoadNetwork, RoadSegment, RouterPoint,
    TableProfile,
};
pub use path::{EdgePath, PathId, PathTree};
pub use priority::EdgeDifferencePriority;
pub use weight::{AugmentedWeight, AugmentedWeightHandler, DefaultWeightHandler, WeightHandler};
pub use witness::WitnessCalculator;

/// Lifecycle of a single-shot algorithm run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    NotRun,
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn has_run(self) -> bool {
        self != RunState::NotRun
    }

    pub fn has_succeeded(self) -> bool {
        self == RunState::Succeeded
    }

    /// Moves `NotRun` to `Running`, refusing a second run.
    pub(crate) fn start(&mut self) -> Result<()> {
        if *self != RunState::NotRun {
            return Err(ChError::AlreadyRun);
        }
        *self = RunState::Running;
        Ok(())
    }
}
