use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use butterfly_ch::validate::{dijkstra_weight, path_weight, validate_matrix, validate_queries};
use butterfly_ch::{
    build_graph, AugmentedWeightHandler, BidirectionalDykstra, ContractionConfig,
    DefaultWeightHandler, DirectedEdgeId, DirectedGraph, Factor, HierarchyBuilder,
    ManyToManyWeights, RoadNetwork, RouterPoint, TableProfile, Vertex, WeightHandler,
};

const N: u32 = 40;

fn profile() -> TableProfile {
    TableProfile::new(vec![
        Factor::new(1.0, None),
        Factor::new(1.0, Some(true)),
        Factor::new(1.0, Some(false)),
        Factor {
            value: 2.0,
            speed: 5.0,
            direction: None,
        },
    ])
}

/// Ring for connectivity plus random chords, some of them one way.
fn network(seed: u64) -> RoadNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut network = RoadNetwork::default();
    for v in 0..N {
        let distance = rng.random_range(1..50) as f32;
        network.add_segment(v, (v + 1) % N, distance, 0);
    }
    for _ in 0..2 * N {
        let from = rng.random_range(0..N);
        let to = rng.random_range(0..N);
        let distance = rng.random_range(1..100) as f32;
        let profile = rng.random_range(0..4);
        network.add_segment(from, to, distance, profile);
    }
    network
}

fn contracted<H: WeightHandler>(
    original: &DirectedGraph,
    handler: H,
    config: &ContractionConfig,
) -> DirectedGraph {
    let mut graph = original.clone();
    let mut builder = HierarchyBuilder::from_config(&mut graph, handler, config).unwrap();
    builder.run().unwrap();
    graph
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-3 * a.abs().max(1.0)
}

#[test]
fn test_queries_match_dijkstra() {
    for seed in [1, 2, 3] {
        let h = DefaultWeightHandler;
        let original = build_graph(&network(seed), &profile(), h).unwrap();
        let ch = contracted(&original, h, &ContractionConfig::default());

        for source in 0..N {
            for target in 0..N {
                let expected = dijkstra_weight(&original, h, source, target);
                let mut query =
                    BidirectionalDykstra::from_vertices(&ch, h, source, target).unwrap();
                query.run().unwrap();
                match (expected, query.weight()) {
                    (None, None) => assert!(!query.has_succeeded()),
                    (Some(a), Some(b)) => assert!(close(a, b), "{source} -> {target}: {a} vs {b}"),
                    (a, b) => panic!("{source} -> {target}: dijkstra {a:?}, hierarchy {b:?}"),
                }
            }
        }
    }
}

#[test]
fn test_unpacked_paths_follow_original_edges() {
    let h = DefaultWeightHandler;
    let original = build_graph(&network(7), &profile(), h).unwrap();
    let ch = contracted(&original, h, &ContractionConfig::default());

    for source in 0..N {
        for target in (0..N).step_by(3) {
            let mut query = BidirectionalDykstra::from_vertices(&ch, h, source, target).unwrap();
            query.run().unwrap();
            let Some(weight) = query.weight() else {
                continue;
            };
            let path = query.path().unwrap().unwrap();
            assert_eq!(path.first(), Some(&source));
            assert_eq!(path.last(), Some(&target));
            let walked = path_weight(&original, h, &path).expect("path uses original edges");
            assert!(close(walked, weight), "{source} -> {target}: {walked} vs {weight}");
        }
    }
}

#[test]
fn test_matrix_matches_point_queries() {
    let h = DefaultWeightHandler;
    let original = build_graph(&network(11), &profile(), h).unwrap();
    let ch = contracted(&original, h, &ContractionConfig::default());

    let sources: Vec<Vertex> = (0..N).step_by(4).collect();
    let targets: Vec<Vertex> = (1..N).step_by(5).collect();
    let mut m2m = ManyToManyWeights::from_vertices(&ch, h, &sources, &targets).unwrap();
    m2m.run().unwrap();

    for (i, &s) in sources.iter().enumerate() {
        for (j, &t) in targets.iter().enumerate() {
            let mut query = BidirectionalDykstra::from_vertices(&ch, h, s, t).unwrap();
            query.run().unwrap();
            let expected = query.weight().unwrap_or(h.infinite());
            assert_eq!(m2m.weights()[i][j], expected, "[{i}][{j}] {s} -> {t}");
        }
    }
}

#[test]
fn test_contraction_is_deterministic() {
    let h = DefaultWeightHandler;
    let original = build_graph(&network(5), &profile(), h).unwrap();
    let config = ContractionConfig::default();

    let a = contracted(&original, h, &config);
    let b = contracted(&original, h, &config);
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn test_hop_limited_witnesses_stay_correct() {
    let h = DefaultWeightHandler;
    let original = build_graph(&network(13), &profile(), h).unwrap();
    let config = ContractionConfig {
        hop_limit: 2,
        max_settles: Some(30),
        ..ContractionConfig::default()
    };
    let ch = contracted(&original, h, &config);

    let result = validate_queries(&original, &ch, h, 300, 42).unwrap();
    assert!(result.is_valid(), "{result}");
    let result = validate_matrix(&original, &ch, h, 12, 42).unwrap();
    assert!(result.is_valid(), "{result}");
    assert_eq!(result.n_tests, 144);
}

#[test]
fn test_augmented_weights_route_on_value() {
    let h = AugmentedWeightHandler;
    let original = build_graph(&network(17), &profile(), h).unwrap();
    let ch = contracted(&original, h, &ContractionConfig::default());

    for target in 0..N {
        let expected = dijkstra_weight(&original, h, 0, target).map(|w| w.value);
        let mut query = BidirectionalDykstra::from_vertices(&ch, h, 0, target).unwrap();
        query.run().unwrap();
        let actual = query.weight();
        match (expected, actual) {
            (Some(a), Some(b)) => {
                assert!(close(a, b.value));
                let path = query.path().unwrap().unwrap();
                let walked = path_weight(&original, h, &path).unwrap();
                assert!(close(walked.value, b.value));
                assert!(b.distance >= 0.0 && b.time >= 0.0);
            }
            (None, None) => {}
            (a, b) => panic!("0 -> {target}: {a:?} vs {b:?}"),
        }
    }
}

#[test]
fn test_router_points_and_directed_edges() {
    let h = DefaultWeightHandler;
    let net = network(19);
    let prof = profile();
    let original = build_graph(&net, &prof, h).unwrap();
    let ch = contracted(&original, h, &ContractionConfig::default());

    // Halfway along ring segment 0 (0 -> 1) to halfway along ring segment 5.
    let source = RouterPoint::new(0, 0.5).unwrap();
    let target = RouterPoint::new(5, 0.5).unwrap();
    let mut query =
        BidirectionalDykstra::from_router_points(&ch, h, &net, &prof, &source, &target).unwrap();
    query.run().unwrap();
    assert!(query.has_succeeded());

    let mut m2m =
        ManyToManyWeights::from_router_points(&ch, h, &net, &prof, &[source], &[target, source])
            .unwrap();
    m2m.run().unwrap();
    assert_eq!(m2m.weights()[0][0], query.weight().unwrap());
    // Same point both ends: out to an endpoint of the segment and back.
    assert_eq!(m2m.weights()[0][1], net.segment(0).unwrap().distance);

    // Best over the four endpoint combinations on the original graph.
    let half = |edge: u32| net.segment(edge).unwrap().distance / 2.0;
    let mut expected = f32::MAX;
    for (s, s_off) in [(1, half(0)), (0, half(0))] {
        for (t, t_off) in [(5, half(5)), (6, half(5))] {
            if let Some(w) = dijkstra_weight(&original, h, s, t) {
                expected = expected.min(s_off + w + t_off);
            }
        }
    }
    assert!(close(query.weight().unwrap(), expected));

    // Directed edges: leave over ring segment 0, arrive over ring segment 5.
    let sources = [DirectedEdgeId::new(0, true)];
    let targets = [DirectedEdgeId::new(5, true), DirectedEdgeId::new(5, false)];
    let mut m2m =
        ManyToManyWeights::from_directed_edges(&ch, h, &net, &prof, &sources, &targets).unwrap();
    m2m.run().unwrap();
    let d0 = net.segment(0).unwrap().distance;
    let d5 = net.segment(5).unwrap().distance;
    let along = dijkstra_weight(&original, h, 1, 5).map(|w| d0 + w + d5);
    let against = dijkstra_weight(&original, h, 1, 6).map(|w| d0 + w + d5);
    assert!(close(m2m.weights()[0][0], along.unwrap()));
    assert!(close(m2m.weights()[0][1], against.unwrap()));
}
