//! Similarity graph builder.
//!
//! Compares every unordered pair of feature vectors with cosine similarity
//! and keeps the pairs at or above the threshold.
//!
//! ## Scaling
//!
//! The all-pairs scan is O(n²·d). Space counts are in the tens to low
//! hundreds, where this is cheaper than building any index. It is a known
//! limit of the design, not something tuned for.

use tracing::debug;

use crate::config::{validate_threshold, DEFAULT_SIMILARITY_THRESHOLD};
use crate::model::{SimilarityEdge, SpaceId};
use crate::Result;

/// Cosine similarity of two vectors.
///
/// Returns 0 when either vector has zero norm. Vectors of different length
/// are compared over their common prefix; each norm still covers its whole
/// vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Builds the full edge set from scratch on every call.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGraphBuilder {
    threshold: f64,
}

impl Default for SimilarityGraphBuilder {
    fn default() -> Self {
        Self { threshold: DEFAULT_SIMILARITY_THRESHOLD }
    }
}

impl SimilarityGraphBuilder {
    /// Fails with `InvalidConfig` if `threshold` is outside `[0, 1]`.
    pub fn new(threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Emit one edge per pair `i < j` with similarity ≥ threshold.
    /// `space_a` is always the earlier of the two in input order.
    pub fn build(&self, vectors: &[(SpaceId, Vec<f64>)]) -> Vec<SimilarityEdge> {
        let mut edges = Vec::new();
        for (i, (id_a, va)) in vectors.iter().enumerate() {
            for (id_b, vb) in &vectors[i + 1..] {
                if id_a == id_b {
                    continue;
                }
                let sim = cosine_similarity(va, vb);
                if sim >= self.threshold {
                    edges.push(SimilarityEdge {
                        space_a: id_a.clone(),
                        space_b: id_b.clone(),
                        weight: sim.clamp(0.0, 1.0),
                    });
                }
            }
        }
        debug!(nodes = vectors.len(), edges = edges.len(), threshold = self.threshold, "similarity graph built");
        edges
    }
}
