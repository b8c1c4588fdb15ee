//! Hard collision resolution.
//!
//! After the spring simulation, repeatedly push every overlapping pair apart
//! until a pass moves nothing or the pass budget runs out. Each body of a pair
//! moves `(overlap * resolution_overrelaxation + resolution_slack) / 2` along
//! the axis between them, so one push clears the pair with some margin. This
//! can loosen clusters the simulation pulled together.

use crate::config::LayoutConfig;
use super::body::{separation_axis, PhysicsBody};

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionReport {
    /// Passes executed, including the final clean one.
    pub passes: usize,
    /// True if the last pass moved nothing.
    pub converged: bool,
    /// Largest remaining overlap (0 when fully separated).
    pub residual_overlap: f64,
}

pub fn resolve(bodies: &mut [PhysicsBody], config: &LayoutConfig) -> CollisionReport {
    let n = bodies.len();
    let mut passes = 0;
    let mut converged = n < 2;

    while !converged && passes < config.collision_passes {
        passes += 1;
        let mut moved = false;
        for i in 0..n {
            for j in i + 1..n {
                let delta = bodies[j].position - bodies[i].position;
                let distance = delta.length();
                let min_separation = bodies[i].radius + bodies[j].radius + config.collision_padding;
                let overlap = min_separation - distance;
                if overlap <= config.overlap_tolerance {
                    continue;
                }
                let axis = separation_axis(i, j, delta, distance);
                let half = (overlap * config.resolution_overrelaxation + config.resolution_slack) / 2.0;
                bodies[i].position -= axis * half;
                bodies[j].position += axis * half;
                moved = true;
            }
        }
        converged = !moved;
    }

    CollisionReport { passes, converged, residual_overlap: max_overlap(bodies, config) }
}

/// Largest `r_i + r_j + padding - distance` over all pairs, floored at 0.
pub fn max_overlap(bodies: &[PhysicsBody], config: &LayoutConfig) -> f64 {
    let mut worst: f64 = 0.0;
    for i in 0..bodies.len() {
        for j in i + 1..bodies.len() {
            let distance = bodies[i].position.distance(bodies[j].position);
            let min_separation = bodies[i].radius + bodies[j].radius + config.collision_padding;
            worst = worst.max(min_separation - distance);
        }
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    fn body_at(x: f64, y: f64, radius: f64) -> PhysicsBody {
        let mut body = PhysicsBody::new(radius, Position::ORIGIN);
        body.position = Position::new(x, y);
        body
    }

    #[test]
    fn test_separated_bodies_untouched() {
        let config = LayoutConfig::default();
        let mut bodies = vec![body_at(0.0, 0.0, 10.0), body_at(500.0, 0.0, 10.0)];
        let report = resolve(&mut bodies, &config);
        assert!(report.converged);
        assert_eq!(report.passes, 1);
        assert_eq!(bodies[1].position, Position::new(500.0, 0.0));
    }

    #[test]
    fn test_pair_overlap_split_evenly() {
        let config = LayoutConfig {
            resolution_slack: 0.0,
            resolution_overrelaxation: 1.0,
            ..LayoutConfig::default()
        };
        let mut bodies = vec![body_at(0.0, 0.0, 50.0), body_at(100.0, 0.0, 50.0)];
        let report = resolve(&mut bodies, &config);

        // Required separation 116: each side moves 8.
        assert!((bodies[0].position.x + 8.0).abs() < 1e-9);
        assert!((bodies[1].position.x - 108.0).abs() < 1e-9);
        assert!(report.converged);
        assert!(report.residual_overlap <= config.overlap_tolerance);
    }

    #[test]
    fn test_overrelaxed_push_clears_pair_with_margin() {
        let config = LayoutConfig::default();
        let mut bodies = vec![body_at(0.0, 0.0, 50.0), body_at(100.0, 0.0, 50.0)];
        let report = resolve(&mut bodies, &config);

        // Overlap 16: each side moves (16 * 1.8 + 4) / 2 = 16.4.
        assert!((bodies[0].position.x + 16.4).abs() < 1e-9);
        assert!((bodies[1].position.x - 116.4).abs() < 1e-9);
        assert_eq!(report.passes, 2);
        assert!(report.converged);
    }

    #[test]
    fn test_stacked_bodies_fully_resolved() {
        let config = LayoutConfig::default();
        let mut bodies: Vec<PhysicsBody> = (0..12).map(|_| body_at(0.0, 0.0, 60.0)).collect();
        let report = resolve(&mut bodies, &config);

        assert!(bodies.iter().all(|b| b.position.is_finite()));
        assert!(report.converged, "{report:?}");
        assert!(report.residual_overlap <= 1e-6);
    }

    #[test]
    fn test_pass_budget_is_respected() {
        let config = LayoutConfig { collision_passes: 1, ..LayoutConfig::default() };
        let mut bodies: Vec<PhysicsBody> = (0..10).map(|i| body_at(i as f64, 0.0, 60.0)).collect();
        let report = resolve(&mut bodies, &config);
        assert_eq!(report.passes, 1);
    }
}
