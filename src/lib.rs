//! # spacegraph: Topic Spaces on an Infinite Canvas
//!
//! Recomputes where topic spaces sit on a 2D canvas so that similar spaces
//! cluster together and busy spaces get bigger bubbles.
//!
//! ## Pipeline
//!
//! 1. **Vectorize**: TF-IDF over each space's name and tags
//! 2. **Link**: cosine similarity between every pair, kept above a threshold
//! 3. **Cluster**: Louvain modularity optimization over the similarity graph
//! 4. **Lay out**: cluster ring, per-cluster seeding, force simulation, hard
//!    collision resolution
//!
//! Each stage reads from a [`SpaceStore`] and hands one batch to an
//! [`UpdateSink`]. Persistence and transport stay outside this crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spacegraph::{Canvas, MemoryStore, SpaceNode};
//!
//! # async fn example() -> spacegraph::Result<()> {
//! let store = MemoryStore::with_spaces([
//!     SpaceNode::new("jazz", "Jazz Club").with_tags(["music", "live"]),
//!     SpaceNode::new("blues", "Blues Bar").with_tags(["music", "live"]),
//!     SpaceNode::new("rust", "Rustaceans").with_tags(["programming"]),
//! ]);
//! let canvas = Canvas::new(store);
//!
//! let stats = canvas.recompute_all(None).await?;
//! println!("{stats}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod config;
pub mod vectorize;
pub mod similarity;
pub mod community;
pub mod layout;
pub mod pipeline;
pub mod storage;
pub mod export;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    SpaceNode, SpaceId, Position, SimilarityEdge, Community, PresenceRecord,
    VectorUpdate, ClusterUpdate, LayoutUpdate,
};
pub use config::{PipelineConfig, CommunityConfig, LayoutConfig, OccupancySource, DEFAULT_SIMILARITY_THRESHOLD};
pub use vectorize::{Vectorizer, Vectorized};
pub use similarity::{SimilarityGraphBuilder, cosine_similarity};
pub use community::{CommunityDetector, Partition};
pub use layout::{LayoutEngine, LayoutNode, Layout, body_radius};
pub use pipeline::{
    run_pipeline, PipelineOutput, PipelineStats,
    VectorStats, SimilarityStats, ClusterStats, LayoutStats,
};
pub use storage::{SpaceStore, UpdateSink, StoreCapabilities, MemoryStore};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument};

// ============================================================================
// Top-level Canvas handle
// ============================================================================

/// The primary entry point. A `Canvas` wraps a store and runs pipeline
/// stages against it.
///
/// Runs are serialized: a stage started while another run is in flight waits
/// for it, so the last completed run's batches win and no reader sees a
/// half-written stage.
pub struct Canvas<S: SpaceStore + UpdateSink> {
    store: S,
    config: PipelineConfig,
    run_guard: Mutex<()>,
}

impl<S: SpaceStore + UpdateSink> Canvas<S> {
    /// Canvas with default configuration.
    pub fn new(store: S) -> Self {
        Self { store, config: PipelineConfig::default(), run_guard: Mutex::new(()) }
    }

    /// Canvas with a validated configuration.
    pub fn with_config(store: S, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config, run_guard: Mutex::new(()) })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Vectorize every space and store the vectors.
    #[instrument(skip(self))]
    pub async fn recompute_vectors(&self) -> Result<VectorStats> {
        let _run = self.run_guard.lock().await;
        self.vectors_stage().await
    }

    /// Rebuild the similarity graph from stored vectors, replacing every
    /// stored edge. `threshold` overrides the configured one for this call.
    #[instrument(skip(self))]
    pub async fn recompute_similarities(&self, threshold: Option<f64>) -> Result<SimilarityStats> {
        let _run = self.run_guard.lock().await;
        self.similarities_stage(threshold).await
    }

    /// Partition stored spaces using stored edges and store cluster ids.
    #[instrument(skip(self))]
    pub async fn recompute_clusters(&self) -> Result<ClusterStats> {
        let _run = self.run_guard.lock().await;
        self.clusters_stage().await
    }

    /// Lay out stored spaces using stored cluster ids and edges.
    pub async fn recompute_layout(&self) -> Result<LayoutStats> {
        self.recompute_layout_at(Utc::now()).await
    }

    /// Like [`recompute_layout`](Self::recompute_layout) with an explicit
    /// clock for presence-derived occupancy.
    #[instrument(skip(self))]
    pub async fn recompute_layout_at(&self, now: DateTime<Utc>) -> Result<LayoutStats> {
        let _run = self.run_guard.lock().await;
        self.layout_stage(now).await
    }

    /// All four stages in order under one guard.
    #[instrument(skip(self))]
    pub async fn recompute_all(&self, threshold: Option<f64>) -> Result<PipelineStats> {
        let _run = self.run_guard.lock().await;
        let threshold = threshold.unwrap_or(self.config.similarity_threshold);
        config::validate_threshold(threshold)?;

        let stats = PipelineStats {
            vectors: self.vectors_stage().await?,
            similarities: self.similarities_stage(Some(threshold)).await?,
            clusters: self.clusters_stage().await?,
            layout: self.layout_stage(Utc::now()).await?,
        };
        info!(%stats, "canvas recomputed");
        Ok(stats)
    }

    // ========================================================================
    // Stages (caller holds the run guard)
    // ========================================================================

    async fn vectors_stage(&self) -> Result<VectorStats> {
        let spaces = self.store.list_spaces().await?;
        let vectorized = Vectorizer::new().fit_transform(&spaces);
        let stats = VectorStats { count: vectorized.len(), dimensions: vectorized.dimensions() };

        let batch = vectorized
            .vectors
            .into_iter()
            .map(|(id, feature_vector)| VectorUpdate { id, feature_vector })
            .collect();
        self.store.write_vectors(batch).await?;

        info!(count = stats.count, dimensions = stats.dimensions, "vectors recomputed");
        Ok(stats)
    }

    async fn similarities_stage(&self, threshold: Option<f64>) -> Result<SimilarityStats> {
        let builder = SimilarityGraphBuilder::new(threshold.unwrap_or(self.config.similarity_threshold))?;

        let spaces = self.store.list_spaces().await?;
        let vectors: Vec<(SpaceId, Vec<f64>)> =
            spaces.into_iter().map(|s| (s.id, s.feature_vector)).collect();
        let edges = builder.build(&vectors);
        let stats = SimilarityStats { link_count: edges.len(), threshold: builder.threshold() };

        self.store.replace_similarity_edges(edges).await?;

        info!(links = stats.link_count, threshold = stats.threshold, "similarities recomputed");
        Ok(stats)
    }

    async fn clusters_stage(&self) -> Result<ClusterStats> {
        let detector = CommunityDetector::new(self.config.community.clone())?;

        let spaces = self.store.list_spaces().await?;
        let edges = self.store.list_similarity_edges().await?;
        let ids: Vec<SpaceId> = spaces.into_iter().map(|s| s.id).collect();
        let partition = detector.detect(&ids, &edges);
        let stats = ClusterStats { cluster_count: partition.cluster_count(), modularity: partition.modularity };

        let batch = partition
            .assignments
            .into_iter()
            .map(|(id, cluster_id)| ClusterUpdate { id, cluster_id })
            .collect();
        self.store.write_clusters(batch).await?;

        info!(clusters = stats.cluster_count, modularity = stats.modularity, levels = partition.levels, "clusters recomputed");
        Ok(stats)
    }

    async fn layout_stage(&self, now: DateTime<Utc>) -> Result<LayoutStats> {
        let engine = LayoutEngine::new(self.config.layout.clone())?;

        let spaces = self.store.list_spaces().await?;
        let edges = self.store.list_similarity_edges().await?;
        let presence = match self.config.occupancy {
            OccupancySource::Presence => self.store.list_presence_records().await?,
            OccupancySource::Stored => Vec::new(),
        };

        let users = pipeline::occupancy(&spaces, &presence, &self.config, now);
        let nodes = pipeline::layout_nodes(&spaces, &users);
        let layout = engine.run(&nodes, &edges);
        let stats = pipeline::layout_stats(&layout);

        if !self.store.capabilities().atomic_batches {
            tracing::debug!("store applies layout records individually; a failed write is repaired by re-running");
        }
        self.store.write_layout(layout.updates).await?;

        info!(
            nodes = stats.node_count,
            clusters = stats.cluster_count,
            collision_passes = stats.collision_passes,
            "layout recomputed"
        );
        Ok(stats)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
