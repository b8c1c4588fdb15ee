//! Overlapping pipeline runs on one canvas.
//!
//! Runs are serialized by the canvas, so concurrent callers all succeed and
//! the store ends in the state of a complete run.

use std::sync::Arc;

use spacegraph::{Canvas, MemoryStore, SpaceNode};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_leave_consistent_state() {
    let spaces: Vec<SpaceNode> = (0..20)
        .map(|i| {
            let topic = ["music", "games", "code", "art"][i % 4];
            SpaceNode::new(format!("s{i}"), format!("{topic} room {i}")).with_tags([topic])
        })
        .collect();
    let canvas = Arc::new(Canvas::new(MemoryStore::with_spaces(spaces)));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let canvas = Arc::clone(&canvas);
        handles.push(tokio::spawn(async move { canvas.recompute_all(None).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 4 runs × 4 stages, none lost or interleaved into a failure.
    assert_eq!(canvas.store().batches_applied(), 16);

    let reference = Canvas::new(MemoryStore::with_spaces(canvas.store().spaces()));
    reference.recompute_all(None).await.unwrap();
    for (a, b) in canvas.store().spaces().iter().zip(reference.store().spaces()) {
        assert_eq!(a.cluster_id, b.cluster_id);
        assert!(a.position.distance(b.position) < 1e-6);
    }
}

#[tokio::test]
async fn test_stages_from_parallel_callers_serialize() {
    let canvas = Arc::new(Canvas::new(MemoryStore::with_spaces([
        SpaceNode::new("a", "Alpha").with_tags(["x"]),
        SpaceNode::new("b", "Beta").with_tags(["x"]),
    ])));
    canvas.recompute_vectors().await.unwrap();

    let (links, clusters) = tokio::join!(canvas.recompute_similarities(None), canvas.recompute_clusters());
    links.unwrap();
    clusters.unwrap();
    assert_eq!(canvas.store().edges().len(), 1);
}
