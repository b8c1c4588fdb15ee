//! # Layout Engine
//!
//! Places every space on the canvas in four ordered phases:
//!
//! | Phase | What happens |
//! |-------|--------------|
//! | `ClusterPlacement` | community centers spread evenly on a ring around the origin |
//! | `Seeding` | members of each community placed evenly on a circle around its center |
//! | `Simulation` | fixed number of force iterations (repulsion, collision springs, edge attraction, centering, damping) |
//! | `CollisionResolution` | bounded hard passes pushing overlapping bubbles apart |
//!
//! Bodies live in a dense `Vec<PhysicsBody>` indexed once per run, with an
//! id → index table built up front. Nothing is looked up by id inside the
//! iteration loops.

pub mod body;
pub mod collision;
pub mod forces;

use std::f64::consts::TAU;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::model::{LayoutUpdate, Position, SimilarityEdge, SpaceId};
use crate::Result;

pub use body::{body_radius, PhysicsBody};
pub use collision::CollisionReport;
pub use forces::BodyLink;

// ============================================================================
// Input / output
// ============================================================================

/// What the engine needs to know about one space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: SpaceId,
    pub cluster_id: u32,
    pub active_user_count: u32,
}

impl LayoutNode {
    pub fn new(id: impl Into<SpaceId>, cluster_id: u32, active_user_count: u32) -> Self {
        Self { id: id.into(), cluster_id, active_user_count }
    }
}

/// Phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayoutPhase {
    ClusterPlacement,
    Seeding,
    Simulation,
    CollisionResolution,
    Done,
}

/// Result of a layout run.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// One update per input node, in input order.
    pub updates: Vec<LayoutUpdate>,
    /// Body radius per input node, in input order.
    pub radii: Vec<f64>,
    /// Center per distinct cluster id, ascending by id.
    pub cluster_centers: Vec<(u32, Position)>,
    pub collisions: CollisionReport,
}

impl Layout {
    fn empty() -> Self {
        Self {
            updates: Vec::new(),
            radii: Vec::new(),
            cluster_centers: Vec::new(),
            collisions: CollisionReport { passes: 0, converged: true, residual_overlap: 0.0 },
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Run all four phases. Edges whose endpoints are not in `nodes` are ignored.
    pub fn run(&self, nodes: &[LayoutNode], edges: &[SimilarityEdge]) -> Layout {
        if nodes.is_empty() {
            return Layout::empty();
        }
        let mut sim = Simulation::new(&self.config, nodes, edges);
        sim.place_clusters();
        sim.seed();
        sim.simulate();
        let collisions = sim.resolve_collisions();
        sim.finish(collisions)
    }
}

/// Per-run state. Discarded once the layout is produced.
struct Simulation<'a> {
    config: &'a LayoutConfig,
    nodes: &'a [LayoutNode],
    bodies: Vec<PhysicsBody>,
    links: Vec<BodyLink>,
    centers: Vec<(u32, Position)>,
    phase: LayoutPhase,
}

impl<'a> Simulation<'a> {
    fn new(config: &'a LayoutConfig, nodes: &'a [LayoutNode], edges: &[SimilarityEdge]) -> Self {
        let index: HashMap<&SpaceId, usize> = nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();

        let links = edges
            .iter()
            .filter_map(|e| {
                let a = *index.get(&e.space_a)?;
                let b = *index.get(&e.space_b)?;
                (a != b).then_some(BodyLink { a, b, weight: e.weight })
            })
            .collect();

        let bodies = nodes
            .iter()
            .map(|n| PhysicsBody::new(body_radius(n.active_user_count, config), Position::ORIGIN))
            .collect();

        Self { config, nodes, bodies, links, centers: Vec::new(), phase: LayoutPhase::ClusterPlacement }
    }

    fn advance(&mut self, from: LayoutPhase, to: LayoutPhase) {
        debug_assert_eq!(self.phase, from, "layout phases must run in order");
        self.phase = to;
    }

    fn center_of(&self, cluster_id: u32) -> Position {
        self.centers
            .binary_search_by_key(&cluster_id, |(id, _)| *id)
            .map(|i| self.centers[i].1)
            .unwrap_or(Position::ORIGIN)
    }

    fn place_clusters(&mut self) {
        let mut ids: Vec<u32> = self.nodes.iter().map(|n| n.cluster_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let count = ids.len() as f64;
        self.centers = ids
            .into_iter()
            .enumerate()
            .map(|(k, id)| (id, Position::polar(self.config.cluster_ring_radius, TAU * k as f64 / count)))
            .collect();

        for i in 0..self.bodies.len() {
            self.bodies[i].target = self.center_of(self.nodes[i].cluster_id);
        }
        self.advance(LayoutPhase::ClusterPlacement, LayoutPhase::Seeding);
    }

    fn seed(&mut self) {
        for ci in 0..self.centers.len() {
            let (cluster_id, center) = self.centers[ci];
            let members: Vec<usize> = (0..self.nodes.len())
                .filter(|&i| self.nodes[i].cluster_id == cluster_id)
                .collect();

            if let [only] = members.as_slice() {
                self.bodies[*only].position = center;
                continue;
            }

            let count = members.len() as f64;
            let avg_radius = members.iter().map(|&i| self.bodies[i].radius).sum::<f64>() / count;
            let ring = (avg_radius * self.config.seed_radius_per_avg_radius
                + count * self.config.seed_radius_per_member)
                .clamp(self.config.seed_radius_min, self.config.seed_radius_max);

            for (slot, &i) in members.iter().enumerate() {
                self.bodies[i].position = center + Position::polar(ring, TAU * slot as f64 / count);
            }
        }
        self.advance(LayoutPhase::Seeding, LayoutPhase::Simulation);
    }

    fn simulate(&mut self) {
        let mut scratch = vec![Position::ORIGIN; self.bodies.len()];
        for _ in 0..self.config.simulation_iterations {
            forces::step(&mut self.bodies, &self.links, &mut scratch, self.config);
        }
        debug!(
            bodies = self.bodies.len(),
            links = self.links.len(),
            iterations = self.config.simulation_iterations,
            overlap = collision::max_overlap(&self.bodies, self.config),
            "force simulation finished"
        );
        self.advance(LayoutPhase::Simulation, LayoutPhase::CollisionResolution);
    }

    fn resolve_collisions(&mut self) -> CollisionReport {
        let report = collision::resolve(&mut self.bodies, self.config);
        if !report.converged {
            warn!(
                passes = report.passes,
                residual_overlap = report.residual_overlap,
                "collision budget exhausted with bubbles still overlapping"
            );
        }
        self.advance(LayoutPhase::CollisionResolution, LayoutPhase::Done);
        report
    }

    fn finish(mut self, collisions: CollisionReport) -> Layout {
        for (i, body) in self.bodies.iter_mut().enumerate() {
            if !body.position.is_finite() {
                warn!(space = %self.nodes[i].id, "non-finite position, snapping to cluster center");
                body.position = body.target;
            }
        }

        let updates = self
            .nodes
            .iter()
            .zip(&self.bodies)
            .map(|(n, b)| LayoutUpdate {
                id: n.id.clone(),
                position: b.position,
                cluster_id: n.cluster_id,
                active_user_count: n.active_user_count,
            })
            .collect();
        let radii = self.bodies.iter().map(|b| b.radius).collect();

        Layout { updates, radii, cluster_centers: self.centers, collisions }
    }
}
