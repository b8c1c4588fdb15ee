//! Transient simulation state, one body per space.

use crate::config::LayoutConfig;
use crate::model::Position;

/// Golden angle in radians; spreads fallback directions evenly.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Below this separation two points are treated as coincident.
pub(crate) const COINCIDENT_EPSILON: f64 = 1e-9;

/// Radius of a space's bubble. The same formula sizes every force and
/// collision check.
pub fn body_radius(active_user_count: u32, config: &LayoutConfig) -> f64 {
    config.base_radius + f64::from(active_user_count.max(1)).sqrt() * config.occupancy_scale
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub position: Position,
    pub velocity: Position,
    /// Center of the body's community.
    pub target: Position,
    pub radius: f64,
}

impl PhysicsBody {
    pub fn new(radius: f64, target: Position) -> Self {
        Self { position: target, velocity: Position::ORIGIN, target, radius }
    }
}

/// Unit vector from body `i` towards body `j`. Coincident bodies get a fixed
/// direction derived from their indices.
pub(crate) fn separation_axis(i: usize, j: usize, delta: Position, distance: f64) -> Position {
    if distance > COINCIDENT_EPSILON {
        delta * (1.0 / distance)
    } else {
        let angle = (i * 7 + j * 13) as f64 * GOLDEN_ANGLE;
        Position::polar(1.0, angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_floor_at_one_user() {
        let config = LayoutConfig::default();
        assert_eq!(body_radius(0, &config), 92.0);
        assert_eq!(body_radius(1, &config), 92.0);
        assert_eq!(body_radius(4, &config), 114.0);
        assert!(body_radius(100, &config) > body_radius(99, &config));
    }

    #[test]
    fn test_axis_for_coincident_points_is_unit() {
        let axis = separation_axis(2, 5, Position::ORIGIN, 0.0);
        assert!((axis.length() - 1.0).abs() < 1e-12);
        let axis = separation_axis(0, 1, Position::new(0.0, 4.0), 4.0);
        assert_eq!(axis, Position::new(0.0, 1.0));
    }
}
