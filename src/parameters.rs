//! Experiment-wide tunables and metric → canonical unit conversion.

use log::info;
use serde::{Deserialize, Serialize};

/// Metres (or metres/second) per canonical engine unit.
///
/// Fixed: recordings are compared against historical data converted with
/// this exact divisor.
pub const METRIC_PER_CANONICAL: f64 = 2.35;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentParameters {
    /// predator speed / prey speed
    pub predator_prey_speed_ratio: f32,
    /// Canonical units per second.
    pub predator_speed_canonical: f32,
    /// Canonical units; 1.0 is the full arena.
    pub visual_range: f32,
    pub spawn_experiment_service: bool,
}

impl Default for ExperimentParameters {
    fn default() -> Self {
        Self {
            predator_prey_speed_ratio: 1.0,
            predator_speed_canonical: 1.0,
            visual_range: 1.0,
            spawn_experiment_service: false,
        }
    }
}

impl ExperimentParameters {
    pub fn set_predator_speed_metric(&mut self, meters_per_second: f32) {
        self.predator_speed_canonical = metric_to_canonical(meters_per_second);
        info!(
            "Predator speed set: {:.3} (canonical) | {:.3} (m/s)",
            self.predator_speed_canonical, meters_per_second
        );
    }

    pub fn set_visual_range_metric(&mut self, meters: f32) {
        self.visual_range = metric_to_canonical(meters);
        info!(
            "Visual range set: {:.3} (canonical) | {:.3} (m)",
            self.visual_range, meters
        );
    }
}

/// Division happens in double precision and is narrowed once, matching the
/// conversion used for existing recordings.
pub fn metric_to_canonical(value: f32) -> f32 {
    (f64::from(value) / METRIC_PER_CANONICAL) as f32
}
