//! Rejection reasons reported to protocol callers.
//!
//! Experiment outcomes live in [`ExperimentStatus`](crate::status::ExperimentStatus);
//! a `ProtocolError` only says why one operation was refused.

use crate::status::{ExperimentStatus, LifecycleEvent};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("experiment_name is required")]
    MissingExperimentName,

    #[error("experiment '{0}' is not active")]
    UnknownExperiment(String),

    #[error("rewards_cells has {cells} entries but rewards_orientations has {orientations}")]
    RewardsMismatch { cells: usize, orientations: usize },

    #[error("reward cell '{0}' does not exist in the world")]
    UnknownRewardCell(String),

    #[error("cell {0} does not exist in the world")]
    UnknownCell(i32),

    #[error("active experiment limit reached ({capacity})")]
    RegistryFull { capacity: usize },

    #[error("transition {event:?} is not allowed from {from:?}")]
    InvalidTransition {
        from: ExperimentStatus,
        event: LifecycleEvent,
    },

    #[error("experiment '{name}' already ended with {status:?}")]
    ExperimentTerminated {
        name: String,
        status: ExperimentStatus,
    },

    #[error("experiment '{0}' has an episode in progress")]
    EpisodeInProgress(String),

    #[error("experiment '{0}' has no episode in progress")]
    NoEpisode(String),

    #[error("no handler for subject '{0}'")]
    UnknownSubject(String),

    #[error("no free cell available for predator spawn")]
    NoSpawnLocation,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
