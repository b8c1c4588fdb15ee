//! Similarity edge between two spaces.

use serde::{Deserialize, Serialize};
use super::SpaceId;

/// Undirected weighted edge. `space_a` and `space_b` are distinct; the pair is
/// unordered, so `(a, b)` and `(b, a)` name the same edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityEdge {
    pub space_a: SpaceId,
    pub space_b: SpaceId,
    pub weight: f64,
}

impl SimilarityEdge {
    pub fn new(space_a: impl Into<SpaceId>, space_b: impl Into<SpaceId>, weight: f64) -> Self {
        Self { space_a: space_a.into(), space_b: space_b.into(), weight }
    }

    /// True if this edge touches both spaces, in either order.
    pub fn connects(&self, a: &SpaceId, b: &SpaceId) -> bool {
        (&self.space_a == a && &self.space_b == b) || (&self.space_a == b && &self.space_b == a)
    }
}
