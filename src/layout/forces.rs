//! One iteration of the force simulation.
//!
//! Forces are accumulated against the positions at the start of the
//! iteration, then every body is integrated at once.

use crate::config::LayoutConfig;
use crate::model::Position;
use super::body::{separation_axis, PhysicsBody, COINCIDENT_EPSILON};

/// Edge between two body indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyLink {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Advance the simulation by one tick.
///
/// `forces` is scratch space and must be `bodies.len()` long.
pub fn step(bodies: &mut [PhysicsBody], links: &[BodyLink], forces: &mut [Position], config: &LayoutConfig) {
    forces.fill(Position::ORIGIN);
    let n = bodies.len();

    // Repulsion, plus a linear spring once bubbles (with padding) overlap.
    for i in 0..n {
        for j in i + 1..n {
            let delta = bodies[j].position - bodies[i].position;
            let distance = delta.length();
            let axis = separation_axis(i, j, delta, distance);

            let clamped = distance.max(config.min_distance);
            let mut push = config.repulsion / (clamped * clamped);

            let min_separation = bodies[i].radius + bodies[j].radius + config.collision_padding;
            if distance < min_separation {
                push += (min_separation - distance) * config.collision_stiffness;
            }

            forces[i] -= axis * push;
            forces[j] += axis * push;
        }
    }

    for link in links {
        let delta = bodies[link.b].position - bodies[link.a].position;
        let distance = delta.length();
        if distance <= COINCIDENT_EPSILON {
            continue;
        }
        let pull = distance * config.attraction * link.weight;
        let axis = delta * (1.0 / distance);
        forces[link.a] += axis * pull;
        forces[link.b] -= axis * pull;
    }

    for (body, force) in bodies.iter().zip(forces.iter_mut()) {
        *force += (body.target - body.position) * config.centering;
    }

    for (body, force) in bodies.iter_mut().zip(forces.iter()) {
        body.velocity += *force;
        body.position += body.velocity;
        body.velocity = body.velocity * config.damping;
    }
}
