//! Louvain community detection.
//!
//! Greedy modularity optimization in two alternating phases:
//!
//! 1. **Local moving**: visit nodes in index order and move each one to the
//!    neighbouring community with the best modularity gain.
//! 2. **Aggregation**: collapse every community into a super-node (internal
//!    weight becomes a self-loop) and repeat on the smaller graph.
//!
//! The run stops at the first level where no node moves, or at the
//! configured caps.
//!
//! ## Determinism
//!
//! Candidates are compared in ascending community id order and a candidate
//! only replaces the current best when it is better by more than
//! [`GAIN_EPSILON`], so equal gains resolve to the lowest community id. A node
//! leaves its community only for a strictly better one. Final ids are
//! renumbered `0..k` by first appearance in input order.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::config::CommunityConfig;
use crate::model::{Community, SimilarityEdge, SpaceId};
use crate::{Error, Result};

/// Gains closer than this are considered equal.
pub const GAIN_EPSILON: f64 = 1e-12;

// ============================================================================
// Output
// ============================================================================

/// A complete partition of the input nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Community id per input node, in input order.
    pub assignments: Vec<(SpaceId, u32)>,
    /// Communities ordered by id; members in input order.
    pub communities: Vec<Community>,
    /// Modularity of the final partition at the configured resolution.
    pub modularity: f64,
    /// Aggregation levels that produced at least one move.
    pub levels: usize,
}

impl Partition {
    pub fn cluster_count(&self) -> usize {
        self.communities.len()
    }

    pub fn cluster_of(&self, id: &SpaceId) -> Option<u32> {
        self.assignments.iter().find(|(sid, _)| sid == id).map(|(_, c)| *c)
    }
}

// ============================================================================
// Weighted graph over dense indices
// ============================================================================

type Neighbors = SmallVec<[(usize, f64); 8]>;

#[derive(Debug, Clone)]
struct WeightedGraph {
    /// Symmetric adjacency without self-loops.
    adjacency: Vec<Neighbors>,
    self_loops: Vec<f64>,
    /// Weighted degree; a self-loop counts twice.
    degree: Vec<f64>,
    /// Sum of all degrees (2m).
    total: f64,
}

impl WeightedGraph {
    fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut adjacency = vec![Neighbors::new(); n];
        let mut degree = vec![0.0; n];
        for &(a, b, w) in edges {
            adjacency[a].push((b, w));
            adjacency[b].push((a, w));
            degree[a] += w;
            degree[b] += w;
        }
        let total = degree.iter().sum();
        Self { adjacency, self_loops: vec![0.0; n], degree, total }
    }

    fn len(&self) -> usize {
        self.adjacency.len()
    }

    /// Collapse each community into one node.
    fn aggregate(&self, labels: &[usize], count: usize) -> Self {
        let mut self_loops = vec![0.0; count];
        let mut degree = vec![0.0; count];
        let mut cross: HashMap<(usize, usize), f64> = HashMap::new();

        for node in 0..self.len() {
            let c = labels[node];
            self_loops[c] += self.self_loops[node];
            degree[c] += self.degree[node];
            for &(other, w) in &self.adjacency[node] {
                let d = labels[other];
                if c == d {
                    // Each internal edge is seen from both ends.
                    self_loops[c] += w / 2.0;
                } else {
                    *cross.entry((c, d)).or_default() += w;
                }
            }
        }

        let mut entries: Vec<((usize, usize), f64)> = cross.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        let mut adjacency = vec![Neighbors::new(); count];
        for ((c, d), w) in entries {
            adjacency[c].push((d, w));
        }

        Self { adjacency, self_loops, degree, total: self.total }
    }
}

// ============================================================================
// Detector
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CommunityDetector {
    config: CommunityConfig,
}

impl CommunityDetector {
    pub fn new(config: CommunityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_resolution(resolution: f64) -> Result<Self> {
        Self::new(CommunityConfig { resolution, ..CommunityConfig::default() })
    }

    pub fn resolution(&self) -> f64 {
        self.config.resolution
    }

    /// Partition `nodes` using the weighted `edges` between them.
    ///
    /// Nodes without edges end up in singleton communities.
    pub fn detect(&self, nodes: &[SpaceId], edges: &[SimilarityEdge]) -> Partition {
        let n = nodes.len();
        if n == 0 {
            return Partition { assignments: Vec::new(), communities: Vec::new(), modularity: 0.0, levels: 0 };
        }

        let indexed = index_edges(nodes, edges);
        let mut graph = WeightedGraph::from_edges(n, &indexed);
        let mut membership: Vec<usize> = (0..n).collect();
        let mut levels = 0;

        for level in 0..self.config.max_levels {
            let (labels, moved) = local_moving(&graph, self.config.resolution, self.config.max_sweeps);
            if !moved {
                break;
            }
            levels += 1;
            let (labels, count) = renumber(&labels);
            for m in membership.iter_mut() {
                *m = labels[*m];
            }
            debug!(level, nodes = graph.len(), communities = count, "louvain level complete");
            if count == graph.len() {
                break;
            }
            graph = graph.aggregate(&labels, count);
        }

        let (final_labels, count) = renumber(&membership);
        let labels: Vec<u32> = final_labels.iter().map(|&c| c as u32).collect();
        let modularity = modularity_indexed(n, &indexed, &labels, self.config.resolution);

        let mut communities: Vec<Community> = (0..count as u32)
            .map(|id| Community { id, members: Vec::new() })
            .collect();
        for (node, &c) in labels.iter().enumerate() {
            communities[c as usize].members.push(nodes[node].clone());
        }

        let assignments = nodes.iter().cloned().zip(labels).collect();

        Partition { assignments, communities, modularity, levels }
    }
}

/// Map edges onto dense indices. Unknown ids and self-edges are dropped;
/// duplicates keep their largest weight.
fn index_edges(nodes: &[SpaceId], edges: &[SimilarityEdge]) -> Vec<(usize, usize, f64)> {
    let index: HashMap<&SpaceId, usize> = nodes.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let mut dedup: HashMap<(usize, usize), f64> = HashMap::new();

    for edge in edges {
        let (Some(&a), Some(&b)) = (index.get(&edge.space_a), index.get(&edge.space_b)) else {
            warn!(a = %edge.space_a, b = %edge.space_b, "skipping edge to unknown space");
            continue;
        };
        if a == b {
            warn!(space = %edge.space_a, "skipping self-edge");
            continue;
        }
        if !(edge.weight.is_finite() && edge.weight >= 0.0) {
            warn!(a = %edge.space_a, b = %edge.space_b, weight = edge.weight, "skipping edge with invalid weight");
            continue;
        }
        let key = (a.min(b), a.max(b));
        let slot = dedup.entry(key).or_insert(edge.weight);
        *slot = slot.max(edge.weight);
    }

    let mut out: Vec<(usize, usize, f64)> = dedup.into_iter().map(|((a, b), w)| (a, b, w)).collect();
    out.sort_unstable_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
    out
}

/// One level of local moving. Returns the community per node and whether
/// any node changed community.
fn local_moving(graph: &WeightedGraph, resolution: f64, max_sweeps: usize) -> (Vec<usize>, bool) {
    let n = graph.len();
    let mut community: Vec<usize> = (0..n).collect();
    let mut sum_tot: Vec<f64> = graph.degree.clone();
    let mut any_moved = false;

    if graph.total <= 0.0 {
        return (community, false);
    }

    let mut links: HashMap<usize, f64> = HashMap::new();
    let mut candidates: Vec<(usize, f64)> = Vec::new();

    for _ in 0..max_sweeps {
        let mut moved = false;

        for node in 0..n {
            let k_i = graph.degree[node];
            if k_i <= 0.0 {
                continue;
            }
            let current = community[node];

            links.clear();
            for &(other, w) in &graph.adjacency[node] {
                *links.entry(community[other]).or_default() += w;
            }

            sum_tot[current] -= k_i;
            let gain = |c: usize, k_in: f64| k_in - resolution * sum_tot[c] * k_i / graph.total;

            let current_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));

            candidates.clear();
            candidates.extend(links.iter().filter(|(c, _)| **c != current).map(|(c, w)| (*c, *w)));
            candidates.sort_unstable_by_key(|(c, _)| *c);

            let mut best = current;
            let mut best_gain = f64::NEG_INFINITY;
            for &(c, k_in) in &candidates {
                let g = gain(c, k_in);
                if g > best_gain + GAIN_EPSILON {
                    best = c;
                    best_gain = g;
                }
            }

            let target = if best != current && best_gain > current_gain + GAIN_EPSILON {
                best
            } else {
                current
            };

            sum_tot[target] += k_i;
            if target != current {
                community[node] = target;
                moved = true;
                any_moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    (community, any_moved)
}

/// Relabel to `0..k` in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let relabeled = labels
        .iter()
        .map(|&l| {
            let next = mapping.len();
            *mapping.entry(l).or_insert(next)
        })
        .collect();
    (relabeled, mapping.len())
}

fn modularity_indexed(n: usize, edges: &[(usize, usize, f64)], labels: &[u32], resolution: f64) -> f64 {
    let k = labels.iter().copied().max().map_or(0, |m| m as usize + 1);
    let mut internal = vec![0.0; k];
    let mut totals = vec![0.0; k];
    let mut degree = vec![0.0; n];
    let mut two_m = 0.0;

    for &(a, b, w) in edges {
        degree[a] += w;
        degree[b] += w;
        two_m += 2.0 * w;
        if labels[a] == labels[b] {
            internal[labels[a] as usize] += 2.0 * w;
        }
    }
    if two_m <= 0.0 {
        return 0.0;
    }
    for (node, &c) in labels.iter().enumerate() {
        totals[c as usize] += degree[node];
    }

    internal
        .iter()
        .zip(&totals)
        .map(|(in_c, tot_c)| in_c / two_m - resolution * (tot_c / two_m).powi(2))
        .sum()
}

/// Modularity of an arbitrary assignment (`labels[i]` is the community of
/// `nodes[i]`). Zero for a graph without edge weight.
///
/// Fails with [`Error::InvalidConfig`] unless there is exactly one label per node.
pub fn modularity(nodes: &[SpaceId], edges: &[SimilarityEdge], labels: &[u32], resolution: f64) -> Result<f64> {
    if labels.len() != nodes.len() {
        return Err(Error::InvalidConfig(format!(
            "modularity needs one label per node: {} labels for {} nodes",
            labels.len(),
            nodes.len()
        )));
    }
    let indexed = index_edges(nodes, edges);
    Ok(modularity_indexed(nodes.len(), &indexed, labels, resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(n: usize) -> Vec<SpaceId> {
        (0..n).map(|i| SpaceId(format!("s{i}"))).collect()
    }

    fn edge(a: usize, b: usize, w: f64) -> SimilarityEdge {
        SimilarityEdge::new(format!("s{a}"), format!("s{b}"), w)
    }

    fn labels(p: &Partition) -> Vec<u32> {
        p.assignments.iter().map(|(_, c)| *c).collect()
    }

    #[test]
    fn test_empty_graph() {
        let p = CommunityDetector::default().detect(&[], &[]);
        assert_eq!(p.cluster_count(), 0);
        assert!(p.assignments.is_empty());
    }

    #[test]
    fn test_single_node() {
        let p = CommunityDetector::default().detect(&ids(1), &[]);
        assert_eq!(labels(&p), vec![0]);
        assert_eq!(p.cluster_count(), 1);
    }

    #[test]
    fn test_pair_and_isolated_node() {
        let p = CommunityDetector::default().detect(&ids(3), &[edge(0, 1, 0.9)]);
        assert_eq!(labels(&p), vec![0, 0, 1]);
        assert_eq!(p.communities[0].members, vec![SpaceId::from("s0"), SpaceId::from("s1")]);
    }

    #[test]
    fn test_two_triangles_with_weak_bridge() {
        let edges = vec![
            edge(0, 1, 1.0), edge(1, 2, 1.0), edge(0, 2, 1.0),
            edge(3, 4, 1.0), edge(4, 5, 1.0), edge(3, 5, 1.0),
            edge(2, 3, 0.1),
        ];
        let p = CommunityDetector::default().detect(&ids(6), &edges);
        assert_eq!(labels(&p), vec![0, 0, 0, 1, 1, 1]);
        assert!(p.modularity > 0.3);
    }

    #[test]
    fn test_isolated_nodes_get_distinct_dense_ids() {
        let p = CommunityDetector::default().detect(&ids(4), &[edge(1, 2, 0.5)]);
        assert_eq!(labels(&p), vec![0, 1, 1, 2]);
        assert_eq!(p.cluster_count(), 3);
    }

    #[test]
    fn test_resolution_controls_granularity() {
        let ring: Vec<SimilarityEdge> = (0..8).map(|i| edge(i, (i + 1) % 8, 1.0)).collect();
        let coarse = CommunityDetector::with_resolution(0.05).unwrap().detect(&ids(8), &ring);
        let default = CommunityDetector::default().detect(&ids(8), &ring);
        let fine = CommunityDetector::with_resolution(5.0).unwrap().detect(&ids(8), &ring);

        assert_eq!(coarse.cluster_count(), 1);
        assert!(default.cluster_count() > 1 && default.cluster_count() < 8);
        assert_eq!(fine.cluster_count(), 8);
    }

    #[test]
    fn test_equal_gain_prefers_lowest_community() {
        // Node 1 sits between 0 and 2 with identical weights; it must join 0.
        let p = CommunityDetector::default().detect(&ids(3), &[edge(0, 1, 1.0), edge(1, 2, 1.0)]);
        assert_eq!(labels(&p)[1], labels(&p)[0]);
    }

    #[test]
    fn test_unknown_and_self_edges_ignored() {
        let edges = vec![
            SimilarityEdge::new("s0", "ghost", 1.0),
            SimilarityEdge::new("s0", "s0", 1.0),
        ];
        let p = CommunityDetector::default().detect(&ids(2), &edges);
        assert_eq!(labels(&p), vec![0, 1]);
    }

    #[test]
    fn test_detect_is_deterministic() {
        let edges = vec![
            edge(0, 1, 0.8), edge(1, 2, 0.4), edge(2, 3, 0.9),
            edge(3, 4, 0.35), edge(4, 5, 0.7), edge(5, 0, 0.31),
        ];
        let a = CommunityDetector::default().detect(&ids(6), &edges);
        let b = CommunityDetector::default().detect(&ids(6), &edges);
        assert_eq!(a, b);
    }

    #[test]
    fn test_modularity_of_trivial_partitions() {
        let nodes = ids(4);
        let edges = vec![edge(0, 1, 1.0), edge(2, 3, 1.0)];
        // Everything in one community: Q = 1 - 1 = 0.
        assert!(modularity(&nodes, &edges, &[0, 0, 0, 0], 1.0).unwrap().abs() < 1e-12);
        // The two components: Q = 2 * (0.5 - 0.25) = 0.5.
        assert!((modularity(&nodes, &edges, &[0, 0, 1, 1], 1.0).unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(modularity(&nodes, &[], &[0, 1, 2, 3], 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_modularity_rejects_label_count_mismatch() {
        let nodes = ids(4);
        let edges = vec![edge(0, 1, 1.0), edge(2, 3, 1.0)];
        assert!(matches!(modularity(&nodes, &edges, &[0, 0, 1], 1.0), Err(Error::InvalidConfig(_))));
        assert!(matches!(modularity(&nodes, &edges, &[0, 0, 1, 1, 2], 1.0), Err(Error::InvalidConfig(_))));
        assert!(matches!(modularity(&nodes, &[], &[], 1.0), Err(Error::InvalidConfig(_))));
    }
}
