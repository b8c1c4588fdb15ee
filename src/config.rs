//! Pipeline configuration.
//!
//! Every tunable lives here as a named field. Defaults reproduce the canvas
//! the UI expects; a JSON document may override any subset of them.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Edge cutoff used when the caller does not pass a threshold.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.3;

/// Recency window for presence heartbeats, in seconds.
pub const DEFAULT_PRESENCE_WINDOW_SECS: i64 = 30;

// ============================================================================
// Top-level config
// ============================================================================

/// Configuration for a full recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Minimum cosine similarity for an edge (inclusive).
    pub similarity_threshold: f64,
    pub community: CommunityConfig,
    pub layout: LayoutConfig,
    /// Where body radii get their occupancy from.
    pub occupancy: OccupancySource,
    pub presence_window_secs: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            community: CommunityConfig::default(),
            layout: LayoutConfig::default(),
            occupancy: OccupancySource::Presence,
            presence_window_secs: DEFAULT_PRESENCE_WINDOW_SECS,
        }
    }
}

impl PipelineConfig {
    /// Parse a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.similarity_threshold)?;
        if self.presence_window_secs < 0 {
            return Err(Error::InvalidConfig(format!(
                "presence window must be non-negative, got {}s",
                self.presence_window_secs
            )));
        }
        self.community.validate()?;
        self.layout.validate()
    }

    pub fn presence_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.presence_window_secs)
    }
}

/// Reject thresholds outside `[0, 1]` (and NaN).
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidConfig(format!(
            "similarity threshold must be within [0, 1], got {threshold}"
        )));
    }
    Ok(())
}

/// Source of the live-occupancy count that sizes each body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OccupancySource {
    /// Count presence records inside the recency window.
    #[default]
    Presence,
    /// Trust `active_user_count` as reported by the store.
    Stored,
}

// ============================================================================
// Community detection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommunityConfig {
    /// Modularity resolution. Higher values give smaller communities.
    pub resolution: f64,
    /// Cap on aggregation levels.
    pub max_levels: usize,
    /// Cap on local-moving sweeps per level.
    pub max_sweeps: usize,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self { resolution: 1.0, max_levels: 32, max_sweeps: 64 }
    }
}

impl CommunityConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "resolution must be positive and finite, got {}",
                self.resolution
            )));
        }
        if self.max_levels == 0 || self.max_sweeps == 0 {
            return Err(Error::InvalidConfig("louvain iteration caps must be non-zero".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Constants for cluster placement, the force simulation and the collision
/// pass. Distances are canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Radius of the ring cluster centers sit on.
    pub cluster_ring_radius: f64,
    pub base_radius: f64,
    pub occupancy_scale: f64,
    pub seed_radius_min: f64,
    pub seed_radius_max: f64,
    pub seed_radius_per_avg_radius: f64,
    pub seed_radius_per_member: f64,
    pub simulation_iterations: usize,
    pub repulsion: f64,
    pub attraction: f64,
    pub collision_stiffness: f64,
    pub collision_padding: f64,
    pub centering: f64,
    pub damping: f64,
    /// Floor for distances in the inverse-square term.
    pub min_distance: f64,
    pub collision_passes: usize,
    /// Overlap below this is treated as resolved.
    pub overlap_tolerance: f64,
    /// Extra separation added when the hard pass pushes a pair apart.
    pub resolution_slack: f64,
    /// Multiplier on the overlap each hard-pass push removes, in `[1, 2)`.
    /// Above 1 the pass overshoots slightly, so dense packs settle in fewer
    /// passes than the budget allows.
    pub resolution_overrelaxation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cluster_ring_radius: 500.0,
            base_radius: 70.0,
            occupancy_scale: 22.0,
            seed_radius_min: 140.0,
            seed_radius_max: 300.0,
            seed_radius_per_avg_radius: 1.4,
            seed_radius_per_member: 18.0,
            simulation_iterations: 160,
            repulsion: 6000.0,
            attraction: 0.0002,
            collision_stiffness: 1.0,
            collision_padding: 16.0,
            centering: 0.001,
            damping: 0.9,
            min_distance: 1.0,
            collision_passes: 20,
            overlap_tolerance: 1e-6,
            resolution_slack: 4.0,
            resolution_overrelaxation: 1.8,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("clusterRingRadius", self.cluster_ring_radius),
            ("baseRadius", self.base_radius),
            ("occupancyScale", self.occupancy_scale),
            ("seedRadiusMin", self.seed_radius_min),
            ("seedRadiusPerAvgRadius", self.seed_radius_per_avg_radius),
            ("seedRadiusPerMember", self.seed_radius_per_member),
            ("repulsion", self.repulsion),
            ("attraction", self.attraction),
            ("collisionStiffness", self.collision_stiffness),
            ("collisionPadding", self.collision_padding),
            ("centering", self.centering),
            ("overlapTolerance", self.overlap_tolerance),
            ("resolutionSlack", self.resolution_slack),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "layout.{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if !(self.seed_radius_max.is_finite() && self.seed_radius_max >= self.seed_radius_min) {
            return Err(Error::InvalidConfig(format!(
                "layout.seedRadiusMax ({}) must be at least seedRadiusMin ({})",
                self.seed_radius_max, self.seed_radius_min
            )));
        }
        if !(self.min_distance.is_finite() && self.min_distance > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "layout.minDistance must be positive, got {}",
                self.min_distance
            )));
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(Error::InvalidConfig(format!(
                "layout.damping must be within [0, 1), got {}",
                self.damping
            )));
        }
        if !(1.0..2.0).contains(&self.resolution_overrelaxation) {
            return Err(Error::InvalidConfig(format!(
                "layout.resolutionOverrelaxation must be within [1, 2), got {}",
                self.resolution_overrelaxation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(config.layout.simulation_iterations, 160);
        assert_eq!(config.layout.collision_passes, 20);
        assert_eq!(config.presence_window(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "similarityThreshold": 0.5, "layout": { "damping": 0.8 }, "occupancy": "stored" }"#,
        )
        .unwrap();
        assert_eq!(config.similarity_threshold, 0.5);
        assert_eq!(config.layout.damping, 0.8);
        assert_eq!(config.layout.repulsion, LayoutConfig::default().repulsion);
        assert_eq!(config.occupancy, OccupancySource::Stored);
        assert_eq!(config.community, CommunityConfig::default());
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(matches!(validate_threshold(1.01), Err(Error::InvalidConfig(_))));
        assert!(matches!(validate_threshold(-0.1), Err(Error::InvalidConfig(_))));
        assert!(matches!(validate_threshold(f64::NAN), Err(Error::InvalidConfig(_))));

        let err = PipelineConfig::from_json_str(r#"{ "similarityThreshold": 2.0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_layout_constants_rejected() {
        let mut layout = LayoutConfig::default();
        layout.damping = 1.0;
        assert!(layout.validate().is_err());

        let mut layout = LayoutConfig::default();
        layout.seed_radius_max = 10.0;
        assert!(layout.validate().is_err());

        let mut layout = LayoutConfig::default();
        layout.resolution_overrelaxation = 2.0;
        assert!(layout.validate().is_err());
        layout.resolution_overrelaxation = 0.5;
        assert!(layout.validate().is_err());

        let mut community = CommunityConfig::default();
        community.resolution = 0.0;
        assert!(community.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
