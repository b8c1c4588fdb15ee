//! Stage outputs and the storage-free pipeline.
//!
//! `Canvas` drives these stages against a store. `run_pipeline` chains the
//! same stages over in-memory input for callers that hold the data already.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::community::{CommunityDetector, Partition};
use crate::config::{OccupancySource, PipelineConfig};
use crate::layout::{Layout, LayoutEngine, LayoutNode};
use crate::model::{active_user_counts, PresenceRecord, SimilarityEdge, SpaceNode};
use crate::similarity::SimilarityGraphBuilder;
use crate::vectorize::{Vectorized, Vectorizer};
use crate::Result;

// ============================================================================
// Stage statistics
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorStats {
    /// Spaces that received a vector.
    pub count: usize,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityStats {
    pub link_count: usize,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    pub cluster_count: usize,
    pub modularity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    pub ok: bool,
    pub node_count: usize,
    pub cluster_count: usize,
    pub collision_passes: usize,
    pub residual_overlap: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub vectors: VectorStats,
    pub similarities: SimilarityStats,
    pub clusters: ClusterStats,
    pub layout: LayoutStats,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PipelineStats {{ vectors: {}, links: {}, clusters: {}, layout_ok: {} }}",
            self.vectors.count, self.similarities.link_count, self.clusters.cluster_count, self.layout.ok,
        )
    }
}

// ============================================================================
// Stage helpers shared with Canvas
// ============================================================================

/// Live occupancy per space according to `config.occupancy`.
pub(crate) fn occupancy(
    spaces: &[SpaceNode],
    presence: &[PresenceRecord],
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Vec<u32> {
    match config.occupancy {
        OccupancySource::Stored => spaces.iter().map(|s| s.active_user_count).collect(),
        OccupancySource::Presence => {
            let counts = active_user_counts(presence, now, config.presence_window());
            spaces.iter().map(|s| counts.get(&s.id).copied().unwrap_or(0)).collect()
        }
    }
}

/// Layout input from stored spaces. A space with no cluster id falls back to 0.
pub(crate) fn layout_nodes(spaces: &[SpaceNode], occupancy: &[u32]) -> Vec<LayoutNode> {
    spaces
        .iter()
        .zip(occupancy)
        .map(|(s, &users)| LayoutNode { id: s.id.clone(), cluster_id: s.cluster_id.unwrap_or(0), active_user_count: users })
        .collect()
}

pub(crate) fn layout_stats(layout: &Layout) -> LayoutStats {
    LayoutStats {
        ok: true,
        node_count: layout.updates.len(),
        cluster_count: layout.cluster_centers.len(),
        collision_passes: layout.collisions.passes,
        residual_overlap: layout.collisions.residual_overlap,
    }
}

// ============================================================================
// In-memory pipeline
// ============================================================================

/// Everything a full run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub vectors: Vectorized,
    pub edges: Vec<SimilarityEdge>,
    pub partition: Partition,
    pub layout: Layout,
}

impl PipelineOutput {
    pub fn stats(&self, threshold: f64) -> PipelineStats {
        PipelineStats {
            vectors: VectorStats { count: self.vectors.len(), dimensions: self.vectors.dimensions() },
            similarities: SimilarityStats { link_count: self.edges.len(), threshold },
            clusters: ClusterStats {
                cluster_count: self.partition.cluster_count(),
                modularity: self.partition.modularity,
            },
            layout: layout_stats(&self.layout),
        }
    }
}

/// Vectorize, link, cluster and lay out `spaces` without touching storage.
///
/// Configuration is validated before any stage runs.
pub fn run_pipeline(
    spaces: &[SpaceNode],
    presence: &[PresenceRecord],
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Result<PipelineOutput> {
    config.validate()?;
    let builder = SimilarityGraphBuilder::new(config.similarity_threshold)?;
    let detector = CommunityDetector::new(config.community.clone())?;
    let engine = LayoutEngine::new(config.layout.clone())?;

    let vectors = Vectorizer::new().fit_transform(spaces);
    let edges = builder.build(&vectors.vectors);

    let ids: Vec<_> = spaces.iter().map(|s| s.id.clone()).collect();
    let partition = detector.detect(&ids, &edges);

    let users = occupancy(spaces, presence, config, now);
    let nodes: Vec<LayoutNode> = partition
        .assignments
        .iter()
        .zip(users)
        .map(|((id, cluster), users)| LayoutNode { id: id.clone(), cluster_id: *cluster, active_user_count: users })
        .collect();
    let layout = engine.run(&nodes, &edges);

    info!(
        spaces = spaces.len(),
        links = edges.len(),
        clusters = partition.cluster_count(),
        "in-memory pipeline complete"
    );

    Ok(PipelineOutput { vectors, edges, partition, layout })
}
