//! Service configuration, loaded through the `config` crate.
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file,
//! then `EXPERIMENT__*` environment variables (`__` separates nesting, e.g.
//! `EXPERIMENT__TIMEOUTS__EPISODE_SECS=45`).

use crate::parameters::ExperimentParameters;
use crate::registry::DEFAULT_MAX_ACTIVE_EXPERIMENTS;
use crate::world::{OcclusionCatalog, DEFAULT_WORLD_RADIUS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How long a track may sit in a `Waiting*` state before it is timed out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutPolicy {
    pub experiment_secs: f64,
    pub episode_secs: f64,
    pub finish_secs: f64,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            experiment_secs: 30.0,
            episode_secs: 30.0,
            finish_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Registry capacity.
    pub max_active_experiments: usize,
    /// Hex radius of the canonical world layout.
    pub world_radius: i32,
    pub parameters: ExperimentParameters,
    pub timeouts: TimeoutPolicy,
    /// Occlusion set name → occluded cell ids.
    pub occlusions: OcclusionCatalog,
    /// Period of the timeout sweep.
    pub sweep_interval_ms: u64,
    /// Reject Start-Experiment when a reward cell id is not in the world.
    pub strict_rewards: bool,
    /// How long a finished or failed session stays queryable.
    pub retention_secs: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_active_experiments: DEFAULT_MAX_ACTIVE_EXPERIMENTS,
            world_radius: DEFAULT_WORLD_RADIUS,
            parameters: ExperimentParameters::default(),
            timeouts: TimeoutPolicy::default(),
            occlusions: OcclusionCatalog::default(),
            sweep_interval_ms: 1000,
            strict_rewards: false,
            retention_secs: 300.0,
        }
    }
}

impl ServiceConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder
            .add_source(
                ::config::Environment::with_prefix("EXPERIMENT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
