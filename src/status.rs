//! Experiment lifecycle: status set, events and the transition table.
//!
//! ```text
//! WaitingExperiment ──StartExperiment──▶ InExperiment ──RequestEpisode──▶ WaitingEpisode
//!        │                                   │                                 │
//!        ▼                                   │ RequestFinish           StartEpisode
//! ErrorStartExperiment                       ▼                                 ▼
//! ErrorTimedOutExperiment          WaitingFinish{Success,Error} ◀──────── InEpisode
//!                                      │             │                         │
//!                           FinishExperiment   FinishEpisode          EpisodeTimerExpired
//!                                      ▼             ▼                         ▼
//!                          FinishedExperiment   FinishedEpisode{Success,}  FailedEpisodeTimer
//! ```
//!
//! Terminal states (`Finished*`, `Error*`) absorb: every event is rejected.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExperimentStatus {
    // active
    InExperiment,
    InEpisode,

    // episode ran out of time, can still be finished
    FailedEpisodeTimer,

    // waiting room
    #[default]
    WaitingExperiment,
    WaitingEpisode,
    WaitingFinishSuccess,
    WaitingFinishError,

    // completion
    FinishedExperiment,
    FinishedEpisodeSuccess,
    FinishedEpisode,

    // errors
    ErrorStartExperiment,
    ErrorStartEpisode,
    ErrorFinishedExperiment,
    ErrorFinishEpisode,
    ErrorResetTrackingAgent,
    #[serde(alias = "TimedOutExperiment")]
    ErrorTimedOutExperiment,
    #[serde(alias = "TimedOutEpisode")]
    ErrorTimedOutEpisode,
    ErrorTimedOutReset,

    /// Fallback for a value nothing classified. Never a transition target.
    Unknown,
}

impl ExperimentStatus {
    pub const ALL: [ExperimentStatus; 19] = [
        Self::InExperiment,
        Self::InEpisode,
        Self::FailedEpisodeTimer,
        Self::WaitingExperiment,
        Self::WaitingEpisode,
        Self::WaitingFinishSuccess,
        Self::WaitingFinishError,
        Self::FinishedExperiment,
        Self::FinishedEpisodeSuccess,
        Self::FinishedEpisode,
        Self::ErrorStartExperiment,
        Self::ErrorStartEpisode,
        Self::ErrorFinishedExperiment,
        Self::ErrorFinishEpisode,
        Self::ErrorResetTrackingAgent,
        Self::ErrorTimedOutExperiment,
        Self::ErrorTimedOutEpisode,
        Self::ErrorTimedOutReset,
        Self::Unknown,
    ];

    pub fn is_active(self) -> bool {
        matches!(self, Self::InExperiment | Self::InEpisode)
    }

    pub fn is_waiting(self) -> bool {
        matches!(
            self,
            Self::WaitingExperiment
                | Self::WaitingEpisode
                | Self::WaitingFinishSuccess
                | Self::WaitingFinishError
        )
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            Self::FinishedExperiment | Self::FinishedEpisodeSuccess | Self::FinishedEpisode
        )
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::ErrorStartExperiment
                | Self::ErrorStartEpisode
                | Self::ErrorFinishedExperiment
                | Self::ErrorFinishEpisode
                | Self::ErrorResetTrackingAgent
                | Self::ErrorTimedOutExperiment
                | Self::ErrorTimedOutEpisode
                | Self::ErrorTimedOutReset
        )
    }

    pub fn is_terminal(self) -> bool {
        self.is_finished() || self.is_error()
    }
}

impl std::fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Which track a timeout applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Experiment,
    Episode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    StartExperiment,
    StartExperimentFailed,
    RequestEpisode,
    StartEpisode,
    StartEpisodeFailed,
    EpisodeTimerExpired,
    RequestFinish { success: bool },
    FinishEpisode,
    FinishEpisodeFailed,
    FinishExperiment,
    FinishExperimentFailed,
    TimedOut(Scope),
    TrackingResetFailed,
    TrackingResetTimedOut,
}

/// The transition table. `Err` leaves the caller's state untouched.
pub fn transition(from: ExperimentStatus, event: LifecycleEvent) -> Result<ExperimentStatus> {
    use ExperimentStatus::*;
    use LifecycleEvent as E;

    let next = match (from, event) {
        (WaitingExperiment, E::StartExperiment) => Some(InExperiment),
        (WaitingExperiment, E::StartExperimentFailed) => Some(ErrorStartExperiment),
        (WaitingExperiment, E::TimedOut(Scope::Experiment)) => Some(ErrorTimedOutExperiment),

        (InExperiment, E::RequestEpisode) => Some(WaitingEpisode),
        (WaitingEpisode, E::StartEpisode) => Some(InEpisode),
        (WaitingEpisode, E::StartEpisodeFailed) => Some(ErrorStartEpisode),
        (WaitingEpisode, E::TimedOut(Scope::Episode)) => Some(ErrorTimedOutEpisode),

        (InEpisode, E::EpisodeTimerExpired) => Some(FailedEpisodeTimer),

        (InExperiment | InEpisode, E::RequestFinish { success: true }) => {
            Some(WaitingFinishSuccess)
        }
        (InExperiment | InEpisode, E::RequestFinish { success: false }) => {
            Some(WaitingFinishError)
        }
        (FailedEpisodeTimer, E::RequestFinish { .. }) => Some(WaitingFinishError),

        (WaitingFinishSuccess, E::FinishEpisode) => Some(FinishedEpisodeSuccess),
        (WaitingFinishError, E::FinishEpisode) => Some(FinishedEpisode),
        (WaitingFinishSuccess | WaitingFinishError, E::FinishEpisodeFailed) => {
            Some(ErrorFinishEpisode)
        }
        (WaitingFinishSuccess | WaitingFinishError, E::FinishExperiment) => {
            Some(FinishedExperiment)
        }
        (WaitingFinishSuccess | WaitingFinishError, E::FinishExperimentFailed) => {
            Some(ErrorFinishedExperiment)
        }
        (WaitingFinishSuccess | WaitingFinishError, E::TimedOut(Scope::Experiment)) => {
            Some(ErrorTimedOutExperiment)
        }
        (WaitingFinishSuccess | WaitingFinishError, E::TimedOut(Scope::Episode)) => {
            Some(ErrorTimedOutEpisode)
        }

        (InExperiment | InEpisode | FailedEpisodeTimer, E::TrackingResetFailed) => {
            Some(ErrorResetTrackingAgent)
        }
        (InExperiment | InEpisode | FailedEpisodeTimer, E::TrackingResetTimedOut) => {
            Some(ErrorTimedOutReset)
        }

        _ => None,
    };

    next.ok_or(ProtocolError::InvalidTransition { from, event })
}
