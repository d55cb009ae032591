//! Error types for contraction and routing

use thiserror::Error;

use crate::graph::Vertex;

/// Errors raised by graph construction, contraction and queries.
///
/// Unreachable targets are not errors: searches report them through
/// `has_succeeded()` and `None` accessors instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChError {
    #[error("negative edge weight: {0}")]
    NegativeWeight(f32),

    #[error("edge weight is not a finite number: {0}")]
    InvalidWeight(f32),

    #[error("vertex {vertex} is out of bounds (graph has {vertex_count} vertices)")]
    VertexOutOfBounds { vertex: Vertex, vertex_count: usize },

    #[error("edge {edge} is out of bounds (network has {edge_count} edges)")]
    EdgeOutOfBounds { edge: u32, edge_count: usize },

    #[error("offset {0} is outside of [0, 1]")]
    InvalidOffset(f32),

    #[error("edge payload has {actual} words, expected {expected}")]
    PayloadSize { expected: usize, actual: usize },

    #[error("algorithm has already run")]
    AlreadyRun,

    #[error("corrupt graph: {0}")]
    Corrupt(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ChError>;
