//! Witness search
//!
//! Before a shortcut `A -> V -> B` is added, a local search from `A` that
//! avoids `V` looks for a path to `B` that is at least as short. Such a path
//! (the witness) makes the shortcut redundant. The forward search witnesses
//! `A -> B`, the backward search from the same source witnesses `B -> A`.

use crate::dykstra::Dykstra;
use crate::error::Result;
use crate::graph::{DirectedGraph, Vertex};
use crate::weight::WeightHandler;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WitnessCalculator {
    hop_limit: u32,
    max_settles: Option<usize>,
}

impl Default for WitnessCalculator {
    fn default() -> Self {
        Self::new(u32::MAX)
    }
}

impl WitnessCalculator {
    /// `hop_limit` bounds the number of edges on a witness path;
    /// `u32::MAX` leaves it unbounded.
    pub fn new(hop_limit: u32) -> Self {
        Self {
            hop_limit,
            max_settles: None,
        }
    }

    pub fn with_max_settles(mut self, max_settles: Option<usize>) -> Self {
        self.max_settles = max_settles;
        self
    }

    pub fn hop_limit(&self) -> u32 {
        self.hop_limit
    }

    /// Marks `targets[i]` as witnessed when a path avoiding `excluded` of
    /// weight at most `weights[i]` exists: from `source` in
    /// `forward_witnessed`, into `source` in `backward_witnessed`.
    ///
    /// Flags already set on entry are left untouched and their targets are
    /// not searched for. Targets the bounded search does not settle stay
    /// unwitnessed.
    #[allow(clippy::too_many_arguments)]
    pub fn calculate<H: WeightHandler>(
        &self,
        graph: &DirectedGraph,
        handler: H,
        source: Vertex,
        targets: &[Vertex],
        weights: &[H::Weight],
        forward_witnessed: &mut [bool],
        backward_witnessed: &mut [bool],
        excluded: Vertex,
    ) -> Result<()> {
        debug_assert_eq!(targets.len(), weights.len());
        self.search(graph, handler, source, targets, weights, forward_witnessed, excluded, false)?;
        self.search(graph, handler, source, targets, weights, backward_witnessed, excluded, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn search<H: WeightHandler>(
        &self,
        graph: &DirectedGraph,
        handler: H,
        source: Vertex,
        targets: &[Vertex],
        weights: &[H::Weight],
        witnessed: &mut [bool],
        excluded: Vertex,
        backward: bool,
    ) -> Result<()> {
        let mut max_weight: Option<H::Weight> = None;
        let mut open = Vec::new();
        for (i, &done) in witnessed.iter().enumerate() {
            if done {
                continue;
            }
            open.push(targets[i]);
            if max_weight.map_or(true, |max| handler.is_smaller(max, weights[i])) {
                max_weight = Some(weights[i]);
            }
        }
        if open.is_empty() {
            return Ok(());
        }

        let mut dykstra = Dykstra::from_vertex(graph, handler, source, backward)?
            .with_exclusions([excluded])
            .with_targets(open)
            .with_max_weight(max_weight)
            .with_max_hops(self.hop_limit)
            .with_max_settles(self.max_settles);
        dykstra.run()?;

        for (i, done) in witnessed.iter_mut().enumerate() {
            if *done {
                continue;
            }
            if let Some(visit) = dykstra.try_get_visit(targets[i]) {
                // Equal weights count as a witness.
                *done = !handler.is_smaller(weights[i], visit.weight);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{reverse_direction, NO_VERTEX};
    use crate::weight::DefaultWeightHandler;

    fn graph(edges: &[(Vertex, Vertex, f32, Option<bool>)]) -> DirectedGraph {
        let h = DefaultWeightHandler;
        let mut graph = h.create_graph();
        for &(from, to, w, d) in edges {
            h.add_edge(&mut graph, from, to, w, d, NO_VERTEX).unwrap();
            h.add_edge(&mut graph, to, from, w, reverse_direction(d), NO_VERTEX).unwrap();
        }
        graph.compress();
        graph
    }

    fn witness(
        calc: WitnessCalculator,
        g: &DirectedGraph,
        source: Vertex,
        target: Vertex,
        weight: f32,
        excluded: Vertex,
    ) -> (bool, bool) {
        let mut forward = [false];
        let mut backward = [false];
        calc.calculate(
            g,
            DefaultWeightHandler,
            source,
            &[target],
            &[weight],
            &mut forward,
            &mut backward,
            excluded,
        )
        .unwrap();
        (forward[0], backward[0])
    }

    #[test]
    fn test_triangle_witness() {
        // 0 - 1 - 2 with a direct 0 - 2 edge.
        let g = graph(&[(0, 1, 100.0, None), (1, 2, 100.0, None), (0, 2, 150.0, None)]);
        let calc = WitnessCalculator::default();

        assert_eq!(witness(calc, &g, 0, 2, 200.0, 1), (true, true));
        assert_eq!(witness(calc, &g, 0, 2, 150.0, 1), (true, true));
        assert_eq!(witness(calc, &g, 0, 2, 149.0, 1), (false, false));
    }

    #[test]
    fn test_hop_limit_zero_never_witnesses() {
        let g = graph(&[(0, 1, 100.0, None), (1, 2, 100.0, None), (0, 2, 150.0, None)]);
        let calc = WitnessCalculator::new(0);
        assert_eq!(witness(calc, &g, 0, 2, 200.0, 1), (false, false));
    }

    #[test]
    fn test_preset_flags_are_kept() {
        let g = graph(&[(0, 1, 100.0, None), (1, 2, 100.0, None)]);
        let mut forward = [true, false];
        let mut backward = [false, true];
        WitnessCalculator::default()
            .calculate(
                &g,
                DefaultWeightHandler,
                0,
                &[2, 2],
                &[200.0, 200.0],
                &mut forward,
                &mut backward,
                1,
            )
            .unwrap();
        assert_eq!(forward, [true, false]);
        assert_eq!(backward, [false, true]);
    }

    #[test]
    fn test_max_settles_stops_before_witness() {
        // The witness 0 - 3 - 2 (100) beats the shortcut 0 - 1 - 2 (200).
        let g = graph(&[
            (0, 1, 100.0, None),
            (1, 2, 100.0, None),
            (0, 3, 50.0, None),
            (3, 2, 50.0, None),
        ]);
        assert_eq!(witness(WitnessCalculator::default(), &g, 0, 2, 200.0, 1), (true, true));

        let calc = WitnessCalculator::default().with_max_settles(Some(1));
        assert_eq!(witness(calc, &g, 0, 2, 200.0, 1), (false, false));
        let calc = WitnessCalculator::default().with_max_settles(Some(3));
        assert_eq!(witness(calc, &g, 0, 2, 200.0, 1), (true, true));
    }

    #[test]
    fn test_witnesses_are_real_paths() {
        let g = graph(&[
            (0, 1, 4.0, None),
            (1, 2, 3.0, Some(true)),
            (2, 3, 2.0, None),
            (3, 0, 6.0, Some(false)),
            (1, 3, 5.0, None),
            (0, 2, 9.0, Some(true)),
            (3, 4, 1.0, None),
            (4, 1, 2.0, Some(false)),
        ]);
        let distance = |source: Vertex, target: Vertex, excluded: Vertex, backward: bool| {
            let mut d = Dykstra::from_vertex(&g, DefaultWeightHandler, source, backward)
                .unwrap()
                .with_exclusions([excluded]);
            d.run().unwrap();
            d.try_get_visit(target).map(|v| v.weight)
        };
        let bounded = [
            WitnessCalculator::new(1),
            WitnessCalculator::new(2),
            WitnessCalculator::default().with_max_settles(Some(2)),
        ];

        for excluded in 0..5 {
            for source in (0..5).filter(|&v| v != excluded) {
                for target in (0..5).filter(|&v| v != excluded && v != source) {
                    let forward = distance(source, target, excluded, false);
                    let backward = distance(source, target, excluded, true);
                    for weight in [3.0, 6.0, 9.0, 14.0] {
                        let exact = (
                            forward.is_some_and(|d| d <= weight),
                            backward.is_some_and(|d| d <= weight),
                        );
                        let full = WitnessCalculator::default();
                        assert_eq!(
                            witness(full, &g, source, target, weight, excluded),
                            exact,
                            "{source} -> {target} avoiding {excluded} within {weight}"
                        );
                        for calc in bounded {
                            let (f, b) = witness(calc, &g, source, target, weight, excluded);
                            assert!(!f || exact.0);
                            assert!(!b || exact.1);
                        }
                    }
                }
            }
        }
    }
}
