use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub clock: ClockConfig,
    pub hitsounds: HitsoundConfig,
    pub curve: CurveConfig,
}

impl PlayerConfig {
    /// Parses a (possibly partial) JSON document. Missing keys keep their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render clock reconciliation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Ceiling for a single frame delta, in milliseconds.
    pub max_frame_delta_ms: f64,
    /// Exponential smoothing factor for frame deltas. `None` disables it.
    pub smoothing: Option<f64>,
    /// Deviation from the audio clock above which the render clock snaps.
    pub resync_threshold_ms: f64,
    /// Share of the remaining gap closed on every tick below the threshold.
    pub correction_factor: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            max_frame_delta_ms: 100.0,
            smoothing: Some(0.1),
            resync_threshold_ms: 30.0,
            correction_factor: 0.1,
        }
    }
}

/// Hitsound scheduling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitsoundConfig {
    pub enabled: bool,
    pub slider_ticks: bool,
    pub lookahead_ms: f64,
    /// How far in the past an event may be and still fire.
    pub hit_window_ms: f64,
}

impl Default for HitsoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slider_ticks: true,
            lookahead_ms: 100.0,
            hit_window_ms: 20.0,
        }
    }
}

/// Curve flattening tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub bezier_tolerance: f32,
    pub arc_tolerance: f32,
    pub max_arc_points: usize,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            bezier_tolerance: 0.08,
            arc_tolerance: 0.1,
            max_arc_points: 1000,
        }
    }
}
