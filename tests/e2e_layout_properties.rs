//! Property tests for the layout engine and the full in-memory pipeline.

use chrono::Utc;
use proptest::prelude::*;
use spacegraph::{
    run_pipeline, CommunityDetector, LayoutConfig, LayoutEngine, LayoutNode, PipelineConfig,
    SimilarityEdge, SpaceId, SpaceNode,
};

const TAGS: &[&str] = &["music", "chess", "rust", "cooking", "film", "poetry", "hiking", "math"];

fn layout_case() -> impl Strategy<Value = (Vec<LayoutNode>, Vec<SimilarityEdge>)> {
    (0usize..=50).prop_flat_map(|n| {
        let nodes = (
            prop::collection::vec(0u32..6, n),
            prop::collection::vec(0u32..=50, n),
        );
        let edges = prop::collection::vec((0..n.max(1), 0..n.max(1), 0.3f64..1.0), 0..=2 * n);
        (nodes, edges).prop_map(move |((clusters, users), raw)| {
            let nodes: Vec<LayoutNode> = (0..n)
                .map(|i| LayoutNode::new(format!("s{i}"), clusters[i], users[i]))
                .collect();
            let edges = raw
                .into_iter()
                .filter(|(a, b, _)| a != b && *a < n && *b < n)
                .map(|(a, b, w)| SimilarityEdge::new(format!("s{a}"), format!("s{b}"), w))
                .collect();
            (nodes, edges)
        })
    })
}

fn space_case() -> impl Strategy<Value = Vec<SpaceNode>> {
    prop::collection::vec(prop::sample::subsequence(TAGS.to_vec(), 0..=3), 0..=30).prop_map(|tag_sets| {
        tag_sets
            .into_iter()
            .enumerate()
            .map(|(i, tags)| SpaceNode::new(format!("space-{i}"), format!("Room {i}")).with_tags(tags))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_layout_separates_every_pair((nodes, edges) in layout_case()) {
        let engine = LayoutEngine::new(LayoutConfig::default()).unwrap();
        let config = engine.config().clone();
        let layout = engine.run(&nodes, &edges);

        prop_assert_eq!(layout.updates.len(), nodes.len());
        for u in &layout.updates {
            prop_assert!(u.position.is_finite());
        }
        for i in 0..layout.updates.len() {
            for j in i + 1..layout.updates.len() {
                let d = layout.updates[i].position.distance(layout.updates[j].position);
                let min = layout.radii[i] + layout.radii[j] + config.collision_padding;
                prop_assert!(d >= min - 1e-6, "pair ({}, {}) at {} < {}", i, j, d, min);
            }
        }
    }

    #[test]
    fn prop_pipeline_assigns_dense_cluster_ids(spaces in space_case()) {
        let out = run_pipeline(&spaces, &[], &PipelineConfig::default(), Utc::now()).unwrap();
        let count = out.partition.cluster_count() as u32;

        prop_assert_eq!(out.partition.assignments.len(), spaces.len());
        for ((id, cluster), space) in out.partition.assignments.iter().zip(&spaces) {
            prop_assert_eq!(id, &space.id);
            prop_assert!(*cluster < count);
        }
        let members: usize = out.partition.communities.iter().map(|c| c.len()).sum();
        prop_assert_eq!(members, spaces.len());
        prop_assert!(out.partition.communities.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn prop_pipeline_is_deterministic(spaces in space_case()) {
        let now = Utc::now();
        let a = run_pipeline(&spaces, &[], &PipelineConfig::default(), now).unwrap();
        let b = run_pipeline(&spaces, &[], &PipelineConfig::default(), now).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_edges_respect_threshold(spaces in space_case(), threshold in 0.0f64..=1.0) {
        let config = PipelineConfig { similarity_threshold: threshold, ..PipelineConfig::default() };
        let out = run_pipeline(&spaces, &[], &config, Utc::now()).unwrap();
        for edge in &out.edges {
            prop_assert!(edge.weight >= threshold);
            prop_assert!(edge.weight <= 1.0);
            prop_assert_ne!(&edge.space_a, &edge.space_b);
        }
    }
}

#[test]
fn test_higher_resolution_never_merges_more() {
    let ids: Vec<SpaceId> = (0..10).map(|i| SpaceId(format!("n{i}"))).collect();
    let edges: Vec<SimilarityEdge> = (0..10)
        .map(|i| SimilarityEdge::new(format!("n{i}"), format!("n{}", (i + 1) % 10), 0.8))
        .collect();
    let coarse = CommunityDetector::with_resolution(0.5).unwrap().detect(&ids, &edges);
    let fine = CommunityDetector::with_resolution(3.0).unwrap().detect(&ids, &edges);
    assert!(fine.cluster_count() >= coarse.cluster_count());
}
