//! Validation of hierarchy correctness
//!
//! Compares hierarchy answers against Dijkstra on the original graph.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use rand::{Rng, SeedableRng};

use crate::bidirectional::BidirectionalDykstra;
use crate::error::Result;
use crate::graph::{forward_allowed, DirectedGraph, Vertex};
use crate::many_to_many::ManyToManyWeights;
use crate::unpack::find_traversal_edge;
use crate::weight::WeightHandler;

#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapItem(f32, Vertex);

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Run Dijkstra on the original graph (ground truth)
pub fn dijkstra_weight<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    source: Vertex,
    target: Vertex,
) -> Option<H::Weight> {
    let n = graph.vertex_count();
    if source as usize >= n || target as usize >= n {
        return None;
    }
    let mut best: Vec<Option<H::Weight>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    best[source as usize] = Some(handler.zero());
    heap.push(Reverse(HeapItem(handler.metric(handler.zero()), source)));

    while let Some(Reverse(HeapItem(metric, u))) = heap.pop() {
        let Some(weight) = best[u as usize] else {
            continue;
        };
        if metric > handler.metric(weight) {
            continue;
        }
        if u == target {
            return Some(weight);
        }

        for edge in graph.edges(u) {
            let (w, direction) = handler.get_edge_weight(&edge);
            if !forward_allowed(direction) {
                continue;
            }
            let v = edge.neighbour() as usize;
            let total = handler.add(weight, w);
            if best[v].map_or(true, |b| handler.is_smaller(total, b)) {
                best[v] = Some(total);
                heap.push(Reverse(HeapItem(handler.metric(total), v as Vertex)));
            }
        }
    }
    None
}

/// Weight of `path` over the lightest original edges between consecutive
/// vertices; `None` if a step has no edge.
pub fn path_weight<H: WeightHandler>(
    graph: &DirectedGraph,
    handler: H,
    path: &[Vertex],
) -> Option<H::Weight> {
    path.windows(2).try_fold(handler.zero(), |total, pair| {
        find_traversal_edge(graph, handler, pair[0], pair[1]).map(|e| handler.add(total, e.weight))
    })
}

fn same_weight(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * a.abs().max(b.abs()).max(1.0)
}

struct Tally {
    n_tests: usize,
    correct: usize,
    incorrect: usize,
    unreachable_both: usize,
    errors: Vec<ValidationError>,
}

impl Tally {
    fn new() -> Self {
        Self {
            n_tests: 0,
            correct: 0,
            incorrect: 0,
            unreachable_both: 0,
            errors: Vec::new(),
        }
    }

    fn record(
        &mut self,
        source: Vertex,
        target: Vertex,
        expected: Option<f32>,
        actual: Option<f32>,
    ) {
        self.n_tests += 1;
        match (expected, actual) {
            (None, None) => {
                self.unreachable_both += 1;
                self.correct += 1;
            }
            (Some(a), Some(b)) if same_weight(a, b) => self.correct += 1,
            _ => {
                self.incorrect += 1;
                if self.errors.len() < 10 {
                    self.errors.push(ValidationError {
                        source,
                        target,
                        dijkstra_weight: expected,
                        ch_weight: actual,
                    });
                }
            }
        }
    }

    fn finish(self) -> ValidationResult {
        ValidationResult {
            n_tests: self.n_tests,
            correct: self.correct,
            incorrect: self.incorrect,
            unreachable_both: self.unreachable_both,
            errors: self.errors,
        }
    }
}

/// Validate random point-to-point queries, including the unpacked path.
pub fn validate_queries<H: WeightHandler>(
    original: &DirectedGraph,
    contracted: &DirectedGraph,
    handler: H,
    n_tests: usize,
    seed: u64,
) -> Result<ValidationResult> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let n = original.vertex_count() as Vertex;
    let mut tally = Tally::new();
    if n == 0 {
        return Ok(tally.finish());
    }

    tracing::info!(n_tests, seed, "validating random queries");
    for i in 0..n_tests {
        let source = rng.random_range(0..n);
        let target = rng.random_range(0..n);

        let expected =
            dijkstra_weight(original, handler, source, target).map(|w| handler.metric(w));

        let mut query = BidirectionalDykstra::from_vertices(contracted, handler, source, target)?;
        query.run()?;
        let mut actual = query.weight().map(|w| handler.metric(w));

        // The unpacked route must follow original edges at the same weight.
        if let Some(path) = query.path()? {
            let walked = path_weight(original, handler, &path).map(|w| handler.metric(w));
            let consistent = path.first() == Some(&source)
                && path.last() == Some(&target)
                && matches!((walked, actual), (Some(a), Some(b)) if same_weight(a, b));
            if !consistent {
                actual = walked;
            }
        }
        tally.record(source, target, expected, actual);

        if (i + 1) % 100 == 0 {
            tracing::debug!(
                done = i + 1,
                n_tests,
                incorrect = tally.incorrect,
                "validation progress"
            );
        }
    }
    Ok(tally.finish())
}

/// Validate a random many-to-many matrix.
pub fn validate_matrix<H: WeightHandler>(
    original: &DirectedGraph,
    contracted: &DirectedGraph,
    handler: H,
    matrix_size: usize,
    seed: u64,
) -> Result<ValidationResult> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let n = original.vertex_count() as Vertex;
    if n == 0 {
        return Ok(Tally::new().finish());
    }

    let sources: Vec<Vertex> = (0..matrix_size).map(|_| rng.random_range(0..n)).collect();
    let targets: Vec<Vertex> = (0..matrix_size).map(|_| rng.random_range(0..n)).collect();
    tracing::info!(matrix_size, seed, "validating matrix");

    let mut m2m = ManyToManyWeights::from_vertices(contracted, handler, &sources, &targets)?;
    m2m.run()?;
    let infinite = handler.metric(handler.infinite());

    let mut tally = Tally::new();
    for (i, &source) in sources.iter().enumerate() {
        for (j, &target) in targets.iter().enumerate() {
            let expected =
                dijkstra_weight(original, handler, source, target).map(|w| handler.metric(w));
            let actual = Some(handler.metric(m2m.weights()[i][j])).filter(|&w| w != infinite);
            tally.record(source, target, expected, actual);
        }
    }
    Ok(tally.finish())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub n_tests: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unreachable_both: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.incorrect == 0
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |n: usize| n as f64 * 100.0 / self.n_tests.max(1) as f64;
        writeln!(f, "=== VALIDATION RESULTS ===")?;
        writeln!(f, "  Total tests:     {}", self.n_tests)?;
        writeln!(f, "  Correct:         {} ({:.2}%)", self.correct, pct(self.correct))?;
        writeln!(f, "  Incorrect:       {} ({:.2}%)", self.incorrect, pct(self.incorrect))?;
        writeln!(f, "  Unreachable:     {}", self.unreachable_both)?;

        if !self.errors.is_empty() {
            writeln!(f, "\n  Sample errors:")?;
            for err in &self.errors {
                writeln!(f, "    {err}")?;
            }
        }

        if self.is_valid() {
            write!(f, "\n  ALL TESTS PASSED")
        } else {
            write!(f, "\n  VALIDATION FAILED")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub source: Vertex,
    pub target: Vertex,
    pub dijkstra_weight: Option<f32>,
    pub ch_weight: Option<f32>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |w: Option<f32>| w.map_or_else(|| "unreachable".to_string(), |w| w.to_string());
        write!(
            f,
            "{} -> {}: Dijkstra={}, CH={}",
            self.source,
            self.target,
            show(self.dijkstra_weight),
            show(self.ch_weight)
        )
    }
}
