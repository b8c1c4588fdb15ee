//! Canvas snapshot export: the stored canvas as JSON.
//!
//! Produces one document with every space's placement and the current edge
//! set, for renderers and for eyeballing a layout outside the app.
//!
//! ```text
//! SpaceStore → export_layout_json() → { "spaces": [...], "edges": [...] }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::model::*;
use crate::storage::SpaceStore;
use crate::Result;

/// One space as it appears in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSnapshot {
    pub id: SpaceId,
    pub name: String,
    pub tags: Vec<String>,
    pub cluster_id: u32,
    pub position: Position,
    pub active_user_count: u32,
}

/// The whole canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasSnapshot {
    pub spaces: Vec<SpaceSnapshot>,
    pub edges: Vec<SimilarityEdge>,
}

impl From<SpaceNode> for SpaceSnapshot {
    fn from(space: SpaceNode) -> Self {
        Self {
            id: space.id,
            name: space.name,
            tags: space.tags,
            // Unclustered spaces render with the default cluster.
            cluster_id: space.cluster_id.unwrap_or(0),
            position: space.position,
            active_user_count: space.active_user_count,
        }
    }
}

/// Read the store into a snapshot.
pub async fn snapshot<S: SpaceStore>(store: &S) -> Result<CanvasSnapshot> {
    let spaces = store.list_spaces().await?;
    let edges = store.list_similarity_edges().await?;
    Ok(CanvasSnapshot { spaces: spaces.into_iter().map(Into::into).collect(), edges })
}

/// Export the stored canvas as pretty-printed JSON.
pub async fn export_layout_json<S: SpaceStore>(store: &S, writer: &mut dyn Write) -> Result<()> {
    let snapshot = snapshot(store).await?;
    serde_json::to_writer_pretty(&mut *writer, &snapshot)?;
    writeln!(writer)?;
    Ok(())
}
