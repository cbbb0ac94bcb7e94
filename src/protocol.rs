//! Experiment session wire protocol.
//!
//! This module owns **every message that crosses the boundary** between the
//! subject application and the experiment orchestrator.
//!
//! ## Operations
//!
//! | Subject             | Request                    | Response                    |
//! |---------------------|----------------------------|-----------------------------|
//! | `get_experiment`    | [`GetExperimentRequest`]   | [`GetExperimentResponse`]   |
//! | `start_experiment`  | [`StartExperimentRequest`] | [`StartExperimentResponse`] |
//! | `finish_experiment` | [`FinishExperimentRequest`]| *(none)*                    |
//! | `start_episode`     | [`StartEpisodeRequest`]    | [`StartEpisodeResponse`]    |
//! | `finish_episode`    | [`FinishEpisodeRequest`]   | [`FinishEpisodeResponse`]   |
//!
//! Fire-and-forget: `update_ghost_movement` ([`UpdateGhostMovement`]) and
//! `record_step` ([`RecordStep`]).
//!
//! ## Design rules
//!
//! 1. Field names are snake_case and part of the wire contract.
//! 2. Unknown fields are ignored on decode; missing optional fields default.
//! 3. `experiment_name` is required on every request that routes to a session.
//! 4. Every reply travels in a [`Reply`] so failures have one channel.

use crate::error::{ProtocolError, Result};
use crate::types::{Location2, Step};
use crate::world::{CellGroup, WorldInfo};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}

pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(ProtocolError::Encode)
}

/// Requests that are routed to a session by name.
pub trait ExperimentScoped {
    fn experiment_name(&self) -> &str;

    /// Name with surrounding whitespace removed; empty is rejected.
    fn validated_name(&self) -> Result<&str> {
        let name = self.experiment_name().trim();
        if name.is_empty() {
            return Err(ProtocolError::MissingExperimentName);
        }
        Ok(name)
    }
}

macro_rules! experiment_scoped {
    ($($ty:ty),* $(,)?) => {
        $(impl ExperimentScoped for $ty {
            fn experiment_name(&self) -> &str {
                &self.experiment_name
            }
        })*
    };
}

// ---------------------------------------------------------------------------
// Get experiment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetExperimentRequest {
    pub experiment_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GetExperimentResponse {
    pub experiment_name: String,
    pub world_info: WorldInfo,
    pub start_date: String,
    pub subject_name: String,
    /// Seconds.
    pub duration: i32,
    /// Seconds.
    pub remaining_time: f32,
    pub episode_count: i32,
    pub rewards_cells: CellGroup,
}

// ---------------------------------------------------------------------------
// Start experiment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StartExperimentRequest {
    pub prefix: String,
    pub suffix: String,
    pub world: WorldInfo,
    pub subject_name: String,
    /// Seconds.
    pub duration: i32,
    /// Cell ids, positionally paired with `rewards_orientations`.
    pub rewards_cells: Vec<String>,
    pub rewards_orientations: Vec<i32>,
}

impl Default for StartExperimentRequest {
    fn default() -> Self {
        Self {
            prefix: "prefix".into(),
            suffix: "suffix".into(),
            world: WorldInfo::default(),
            subject_name: "vr_dude".into(),
            duration: 0,
            rewards_cells: Vec::new(),
            rewards_orientations: Vec::new(),
        }
    }
}

/// A reward cell and the orientation it is presented at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RewardPlacement {
    pub cell_id: String,
    pub orientation: i32,
}

impl StartExperimentRequest {
    /// Pair the parallel wire arrays. Mismatched lengths are rejected.
    pub fn reward_placements(&self) -> Result<Vec<RewardPlacement>> {
        if self.rewards_cells.len() != self.rewards_orientations.len() {
            return Err(ProtocolError::RewardsMismatch {
                cells: self.rewards_cells.len(),
                orientations: self.rewards_orientations.len(),
            });
        }
        Ok(self
            .rewards_cells
            .iter()
            .zip(&self.rewards_orientations)
            .map(|(cell_id, &orientation)| RewardPlacement {
                cell_id: cell_id.clone(),
                orientation,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StartExperimentResponse {
    pub experiment_name: String,
    pub start_date: String,
    pub world: WorldInfo,
    pub subject_name: String,
    pub duration: i32,
}

// ---------------------------------------------------------------------------
// Finish experiment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinishExperimentRequest {
    pub experiment_name: String,
}

// ---------------------------------------------------------------------------
// Episodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartEpisodeRequest {
    pub experiment_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StartEpisodeResponse {
    /// Occluded cell ids.
    pub occlusions: Vec<i32>,
    pub predator_spawn_location: Location2,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinishEpisodeRequest {
    pub experiment_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FinishEpisodeResponse {
    pub participant_id: i32,
}

// ---------------------------------------------------------------------------
// One-way updates
// ---------------------------------------------------------------------------

/// Motion delta for the ghost playback agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateGhostMovement {
    pub forward: f32,
    /// Degrees.
    pub rotation: f32,
}

/// A trajectory sample for the running episode of `experiment_name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordStep {
    pub experiment_name: String,
    #[serde(default)]
    pub step: Step,
}

experiment_scoped!(
    GetExperimentRequest,
    FinishExperimentRequest,
    StartEpisodeRequest,
    FinishEpisodeRequest,
    RecordStep,
);

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// One inbound message: which operation, and its encoded body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub subject: String,
    #[serde(default)]
    pub body: serde_json::Value,
}

/// Outer result channel for every operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub subject: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok(subject: impl Into<String>, result: Option<serde_json::Value>) -> Self {
        Self {
            subject: subject.into(),
            success: true,
            result,
            error: None,
        }
    }

    pub fn failed(subject: impl Into<String>, error: impl ToString) -> Self {
        Self {
            subject: subject.into(),
            success: false,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Subject helpers
// ---------------------------------------------------------------------------

/// All subjects understood by the orchestrator, as constants.
pub mod subjects {
    pub const GET_EXPERIMENT: &str = "get_experiment";
    pub const START_EXPERIMENT: &str = "start_experiment";
    pub const FINISH_EXPERIMENT: &str = "finish_experiment";
    pub const START_EPISODE: &str = "start_episode";
    pub const FINISH_EPISODE: &str = "finish_episode";

    pub const UPDATE_GHOST_MOVEMENT: &str = "update_ghost_movement";
    pub const RECORD_STEP: &str = "record_step";
}
