//! # Store and Sink Traits
//!
//! The contract between the pipeline and whatever persists spaces.
//!
//! The pipeline reads through [`SpaceStore`] and writes through
//! [`UpdateSink`]. Each stage reads everything it needs first, computes, and
//! then makes exactly one sink call with its whole batch, so a failed read
//! leaves stored state untouched.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory, batch-atomic; for tests and embedding |

pub mod memory;

use async_trait::async_trait;

use crate::model::*;
use crate::Result;

pub use memory::MemoryStore;

// ============================================================================
// Capabilities
// ============================================================================

/// What a store guarantees about batch writes.
#[derive(Debug, Clone, Default)]
pub struct StoreCapabilities {
    /// Each sink call is applied all-or-nothing.
    pub atomic_batches: bool,
}

// ============================================================================
// Read side
// ============================================================================

/// Read access to the current canvas state.
#[async_trait]
pub trait SpaceStore: Send + Sync + 'static {
    /// All spaces, in a stable order. The order drives vocabulary order,
    /// community numbering and seeding, so it should not change between runs.
    async fn list_spaces(&self) -> Result<Vec<SpaceNode>>;

    /// The currently stored similarity edges.
    async fn list_similarity_edges(&self) -> Result<Vec<SimilarityEdge>>;

    /// Presence heartbeats used to derive live occupancy.
    ///
    /// A store that keeps only counts should return an empty list and be run
    /// with `OccupancySource::Stored`; with presence-derived occupancy an
    /// empty list lays every space out as unoccupied.
    async fn list_presence_records(&self) -> Result<Vec<PresenceRecord>>;

    /// Report batch guarantees. Stores that apply records one at a time
    /// should leave `atomic_batches` false; re-running the pipeline repairs
    /// any partially applied batch.
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }
}

// ============================================================================
// Write side
// ============================================================================

/// Receives one batch per pipeline stage.
#[async_trait]
pub trait UpdateSink: Send + Sync + 'static {
    /// Store a feature vector per space.
    async fn write_vectors(&self, batch: Vec<VectorUpdate>) -> Result<()>;

    /// Replace the entire edge set.
    async fn replace_similarity_edges(&self, edges: Vec<SimilarityEdge>) -> Result<()>;

    /// Store a cluster id per space.
    async fn write_clusters(&self, batch: Vec<ClusterUpdate>) -> Result<()>;

    /// Store position and cluster id per space.
    async fn write_layout(&self, batch: Vec<LayoutUpdate>) -> Result<()>;
}
