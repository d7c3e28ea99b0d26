//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document is enough to
//! override a single threshold.

use crate::error::EngineResult;
use crate::snap::SnapMode;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable thresholds for binding, snapping and reaction dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long the pointer must be held after pointer-down before anchors
    /// resolve precisely.
    pub precise_timeout_ms: u64,
    /// Pointer speed (page units per millisecond) below which entering a new
    /// target produces a precise binding.
    pub slow_drag_velocity: f64,
    /// Horizontal nudge applied when both terminals share a target and anchor.
    pub anchor_nudge: f64,
    /// Control point distance for spline connectors, as a share of the chord.
    pub spline_offset_ratio: f64,
    /// Anchor used in place of the stored one for imprecise bindings.
    pub imprecise_anchor: Point,
    /// Lower bound of the centre snap radius.
    pub center_snap_min: f64,
    /// Upper bound of the centre snap radius.
    pub center_snap_max: f64,
    /// Centre snap radius as a share of the target's smaller side.
    pub center_snap_ratio: f64,
    /// Hit-test margin in screen pixels.
    pub hit_margin: f64,
    /// Reactions nested deeper than this are dropped with a warning.
    pub max_reaction_depth: usize,
    /// Grid snapping for free terminals.
    pub snap_mode: SnapMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precise_timeout_ms: 320,
            slow_drag_velocity: 0.5,
            anchor_nudge: 0.05,
            spline_offset_ratio: 0.25,
            imprecise_anchor: Point::new(0.5, 0.2),
            center_snap_min: 4.0,
            center_snap_max: 16.0,
            center_snap_ratio: 0.15,
            hit_margin: 8.0,
            max_reaction_depth: 16,
            snap_mode: SnapMode::None,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON, filling unspecified fields with defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn precise_timeout(&self) -> Duration {
        Duration::from_millis(self.precise_timeout_ms)
    }

    /// Radius around a target's centre inside which precise anchors snap to
    /// dead centre, in page units.
    pub fn center_snap_radius(&self, width: f64, height: f64, zoom: f64) -> f64 {
        let scaled = (width.min(height) * self.center_snap_ratio).min(self.center_snap_max);
        self.center_snap_min.max(scaled) / zoom.max(f64::EPSILON)
    }
}
