//! Space node on the canvas.

use serde::{Deserialize, Serialize};
use super::Position;

/// Opaque space identifier, as handed out by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(pub String);

impl std::fmt::Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SpaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A topic space.
///
/// `feature_vector` and `cluster_id` are written only by the pipeline;
/// everything else is owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceNode {
    pub id: SpaceId,
    pub name: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub feature_vector: Vec<f64>,
    #[serde(default)]
    pub cluster_id: Option<u32>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub active_user_count: u32,
}

impl SpaceNode {
    pub fn new(id: impl Into<SpaceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: Vec::new(),
            feature_vector: Vec::new(),
            cluster_id: None,
            position: Position::ORIGIN,
            active_user_count: 0,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_active_users(mut self, count: u32) -> Self {
        self.active_user_count = count;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Name and tags joined by whitespace. This is the text the vectorizer reads.
    pub fn document(&self) -> String {
        let mut doc = self.name.clone();
        for tag in &self.tags {
            doc.push(' ');
            doc.push_str(tag);
        }
        doc
    }
}
