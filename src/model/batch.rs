//! Write records handed to the [`UpdateSink`](crate::storage::UpdateSink),
//! one batch per pipeline stage.

use serde::{Deserialize, Serialize};
use super::{Position, SpaceId};

/// Feature vector for one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorUpdate {
    pub id: SpaceId,
    pub feature_vector: Vec<f64>,
}

/// Cluster assignment for one space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterUpdate {
    pub id: SpaceId,
    pub cluster_id: u32,
}

/// Final canvas placement for one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutUpdate {
    pub id: SpaceId,
    pub position: Position,
    pub cluster_id: u32,
    /// Occupancy the body radius was computed from.
    pub active_user_count: u32,
}
