//! In-memory space store.
//!
//! Reference implementation of `SpaceStore` + `UpdateSink`, backed by
//! vectors behind `parking_lot::RwLock`s.
//!
//! ## Batch semantics
//!
//! Every sink call validates the whole batch before touching anything and
//! then applies it under a single write lock, so readers see either the old
//! state or the new one. A batch that names an unknown space is rejected
//! with `Error::NotFound` and leaves the store unchanged.
//!
//! Use this store for:
//! - Testing the pipeline end to end
//! - Embedding the canvas in applications that do their own persistence

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::{Error, Result};
use super::{SpaceStore, StoreCapabilities, UpdateSink};

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory canvas state. Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// Spaces in insertion order.
    spaces: RwLock<Vec<SpaceNode>>,
    edges: RwLock<Vec<SimilarityEdge>>,
    presence: RwLock<Vec<PresenceRecord>>,
    /// Number of sink batches applied.
    batches_applied: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `spaces`.
    pub fn with_spaces(spaces: impl IntoIterator<Item = SpaceNode>) -> Self {
        let store = Self::new();
        for space in spaces {
            store.upsert_space(space);
        }
        store
    }

    /// Insert a space, or replace the one with the same id in place.
    pub fn upsert_space(&self, space: SpaceNode) {
        let mut spaces = self.inner.spaces.write();
        match spaces.iter_mut().find(|s| s.id == space.id) {
            Some(existing) => *existing = space,
            None => spaces.push(space),
        }
    }

    /// Remove a space and every edge touching it. Returns true if it existed.
    pub fn remove_space(&self, id: &SpaceId) -> bool {
        let removed = {
            let mut spaces = self.inner.spaces.write();
            let before = spaces.len();
            spaces.retain(|s| &s.id != id);
            spaces.len() != before
        };
        if removed {
            self.inner.edges.write().retain(|e| &e.space_a != id && &e.space_b != id);
            self.inner.presence.write().retain(|p| &p.space_id != id);
        }
        removed
    }

    /// Replace a space's tags. Fails if the space does not exist.
    pub fn set_tags(&self, id: &SpaceId, tags: Vec<String>) -> Result<()> {
        let mut spaces = self.inner.spaces.write();
        let space = spaces
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| Error::NotFound(format!("Space {id}")))?;
        space.tags = tags;
        Ok(())
    }

    pub fn record_presence(&self, record: PresenceRecord) {
        self.inner.presence.write().push(record);
    }

    pub fn space(&self, id: &SpaceId) -> Option<SpaceNode> {
        self.inner.spaces.read().iter().find(|s| &s.id == id).cloned()
    }

    /// Snapshot of all spaces.
    pub fn spaces(&self) -> Vec<SpaceNode> {
        self.inner.spaces.read().clone()
    }

    /// Snapshot of the edge set.
    pub fn edges(&self) -> Vec<SimilarityEdge> {
        self.inner.edges.read().clone()
    }

    pub fn batches_applied(&self) -> u64 {
        self.inner.batches_applied.load(Ordering::Relaxed)
    }

    /// Resolve every id in the batch to a slot, or fail without writing.
    fn resolve<'a>(spaces: &[SpaceNode], ids: impl Iterator<Item = &'a SpaceId>) -> Result<Vec<usize>> {
        let index: HashMap<&SpaceId, usize> = spaces.iter().enumerate().map(|(i, s)| (&s.id, i)).collect();
        ids.map(|id| index.get(id).copied().ok_or_else(|| Error::NotFound(format!("Space {id}"))))
            .collect()
    }

    fn applied(&self) {
        self.inner.batches_applied.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// SpaceStore impl
// ============================================================================

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn list_spaces(&self) -> Result<Vec<SpaceNode>> {
        Ok(self.spaces())
    }

    async fn list_similarity_edges(&self) -> Result<Vec<SimilarityEdge>> {
        Ok(self.edges())
    }

    async fn list_presence_records(&self) -> Result<Vec<PresenceRecord>> {
        Ok(self.inner.presence.read().clone())
    }

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities { atomic_batches: true }
    }
}

// ============================================================================
// UpdateSink impl
// ============================================================================

#[async_trait]
impl UpdateSink for MemoryStore {
    async fn write_vectors(&self, batch: Vec<VectorUpdate>) -> Result<()> {
        let mut spaces = self.inner.spaces.write();
        let slots = Self::resolve(&spaces, batch.iter().map(|u| &u.id))?;
        for (slot, update) in slots.into_iter().zip(batch) {
            spaces[slot].feature_vector = update.feature_vector;
        }
        self.applied();
        Ok(())
    }

    async fn replace_similarity_edges(&self, edges: Vec<SimilarityEdge>) -> Result<()> {
        {
            let spaces = self.inner.spaces.read();
            Self::resolve(&spaces, edges.iter().flat_map(|e| [&e.space_a, &e.space_b]))?;
        }
        if let Some(bad) = edges.iter().find(|e| e.space_a == e.space_b) {
            return Err(Error::ConstraintViolation(format!("self-edge on space {}", bad.space_a)));
        }
        *self.inner.edges.write() = edges;
        self.applied();
        Ok(())
    }

    async fn write_clusters(&self, batch: Vec<ClusterUpdate>) -> Result<()> {
        let mut spaces = self.inner.spaces.write();
        let slots = Self::resolve(&spaces, batch.iter().map(|u| &u.id))?;
        for (slot, update) in slots.into_iter().zip(batch) {
            spaces[slot].cluster_id = Some(update.cluster_id);
        }
        self.applied();
        Ok(())
    }

    async fn write_layout(&self, batch: Vec<LayoutUpdate>) -> Result<()> {
        let mut spaces = self.inner.spaces.write();
        let slots = Self::resolve(&spaces, batch.iter().map(|u| &u.id))?;
        for (slot, update) in slots.into_iter().zip(batch) {
            spaces[slot].position = update.position;
            spaces[slot].cluster_id = Some(update.cluster_id);
            spaces[slot].active_user_count = update.active_user_count;
        }
        self.applied();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::with_spaces([SpaceNode::new("a", "Alpha"), SpaceNode::new("b", "Beta")])
    }

    #[tokio::test]
    async fn test_upsert_keeps_order() {
        let store = store();
        store.upsert_space(SpaceNode::new("a", "Alpha v2"));
        let spaces = store.list_spaces().await.unwrap();
        assert_eq!(spaces.len(), 2);
        assert_eq!(spaces[0].name, "Alpha v2");
        assert_eq!(spaces[1].id, SpaceId::from("b"));
    }

    #[tokio::test]
    async fn test_batch_with_unknown_id_changes_nothing() {
        let store = store();
        let err = store
            .write_clusters(vec![
                ClusterUpdate { id: "a".into(), cluster_id: 4 },
                ClusterUpdate { id: "missing".into(), cluster_id: 1 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.space(&"a".into()).unwrap().cluster_id, None);
        assert_eq!(store.batches_applied(), 0);
    }

    #[tokio::test]
    async fn test_replace_edges_swaps_whole_set() {
        let store = store();
        store.replace_similarity_edges(vec![SimilarityEdge::new("a", "b", 0.5)]).await.unwrap();
        store.replace_similarity_edges(Vec::new()).await.unwrap();
        assert!(store.edges().is_empty());
        assert_eq!(store.batches_applied(), 2);

        let err = store.replace_similarity_edges(vec![SimilarityEdge::new("a", "a", 1.0)]).await;
        assert!(matches!(err, Err(Error::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_remove_space_drops_its_edges() {
        let store = store();
        store.replace_similarity_edges(vec![SimilarityEdge::new("a", "b", 0.5)]).await.unwrap();
        assert!(store.remove_space(&"b".into()));
        assert!(store.edges().is_empty());
        assert!(!store.remove_space(&"b".into()));
    }

    #[tokio::test]
    async fn test_write_layout_sets_position_cluster_and_occupancy() {
        let store = store();
        store
            .write_layout(vec![LayoutUpdate {
                id: "b".into(),
                position: Position::new(1.0, 2.0),
                cluster_id: 3,
                active_user_count: 16,
            }])
            .await
            .unwrap();
        let b = store.space(&"b".into()).unwrap();
        assert_eq!(b.position, Position::new(1.0, 2.0));
        assert_eq!(b.cluster_id, Some(3));
        assert_eq!(b.active_user_count, 16);
    }
}
