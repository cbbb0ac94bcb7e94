//! Per-experiment session record.
//!
//! A session runs two tracks over the same [`transition`] table: the
//! experiment track (started → finished) and, for each episode, an episode
//! track seeded at `InExperiment`. A terminal episode track stays in place
//! until the next episode starts, then moves to the archive.

use crate::agent::{AgentTracker, Trajectory};
use crate::error::{ProtocolError, Result};
use crate::protocol::RewardPlacement;
use crate::settings::TimeoutPolicy;
use crate::status::{transition, ExperimentStatus, LifecycleEvent, Scope};
use crate::types::{AgentState, Location2, Step};
use crate::world::{CellGroup, WorldInfo};
use chrono::{DateTime, Utc};
use log::{info, warn};

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// A status plus the time it was entered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    status: ExperimentStatus,
    since: f64,
}

impl Track {
    pub fn new(status: ExperimentStatus, now: f64) -> Self {
        Self { status, since: now }
    }

    pub fn status(&self) -> ExperimentStatus {
        self.status
    }

    pub fn since(&self) -> f64 {
        self.since
    }

    pub fn apply(&mut self, event: LifecycleEvent, now: f64) -> Result<ExperimentStatus> {
        let next = transition(self.status, event)?;
        self.status = next;
        self.since = now;
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Episode {
    /// Zero-based position within the experiment.
    pub index: i32,
    pub track: Track,
    pub started_at: f64,
    pub occlusions: Vec<i32>,
    pub predator_spawn_location: Location2,
    pub trajectory: Trajectory,
}

impl Episode {
    pub fn status(&self) -> ExperimentStatus {
        self.track.status()
    }

    pub fn is_live(&self) -> bool {
        !self.track.status().is_terminal()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Fixed facts about an experiment, captured at Start-Experiment.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub name: String,
    pub world: WorldInfo,
    pub subject_name: String,
    pub start_date: String,
    pub started_at: f64,
    /// Seconds; 0 means unbounded.
    pub duration: i32,
    pub rewards: Vec<RewardPlacement>,
    pub rewards_cells: CellGroup,
    pub participant_id: i32,
}

#[derive(Debug)]
pub struct Session {
    info: SessionInfo,
    experiment: Track,
    episode: Option<Episode>,
    archive: Vec<Episode>,
    tracker: AgentTracker,
}

impl Session {
    pub fn new(info: SessionInfo) -> Self {
        let experiment = Track::new(ExperimentStatus::WaitingExperiment, info.started_at);
        Self {
            info,
            experiment,
            episode: None,
            archive: Vec::new(),
            tracker: AgentTracker::new(),
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn experiment_status(&self) -> ExperimentStatus {
        self.experiment.status()
    }

    /// Episode track while the experiment is running and one exists,
    /// otherwise the experiment track.
    pub fn status(&self) -> ExperimentStatus {
        match &self.episode {
            Some(ep) if self.experiment.status() == ExperimentStatus::InExperiment => ep.status(),
            _ => self.experiment.status(),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.experiment.status().is_terminal()
    }

    /// When the experiment track entered its terminal state.
    pub fn terminated_at(&self) -> Option<f64> {
        self.is_terminated().then(|| self.experiment.since())
    }

    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    pub fn archived_episodes(&self) -> &[Episode] {
        &self.archive
    }

    pub fn episode_count(&self) -> i32 {
        (self.archive.len() + usize::from(self.episode.is_some())) as i32
    }

    fn live_episode(&self) -> Option<&Episode> {
        self.episode.as_ref().filter(|ep| ep.is_live())
    }

    pub fn has_live_episode(&self) -> bool {
        self.live_episode().is_some()
    }

    pub fn remaining_time(&self, now: f64) -> f32 {
        let elapsed = now - self.info.started_at;
        (f64::from(self.info.duration) - elapsed).max(0.0) as f32
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_terminated() {
            return Err(ProtocolError::ExperimentTerminated {
                name: self.info.name.clone(),
                status: self.experiment.status(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Experiment track
    // -----------------------------------------------------------------------

    pub fn apply_experiment(
        &mut self,
        event: LifecycleEvent,
        now: f64,
    ) -> Result<ExperimentStatus> {
        let from = self.experiment.status();
        let to = self.experiment.apply(event, now)?;
        info!("Experiment '{}': {} -> {}", self.info.name, from, to);
        Ok(to)
    }

    /// `InExperiment → WaitingFinish* → FinishedExperiment`.
    pub fn finish(&mut self, now: f64) -> Result<ExperimentStatus> {
        self.ensure_open()?;
        if self.has_live_episode() {
            return Err(ProtocolError::EpisodeInProgress(self.info.name.clone()));
        }
        let waiting = transition(
            self.experiment.status(),
            LifecycleEvent::RequestFinish { success: true },
        )?;
        transition(waiting, LifecycleEvent::FinishExperiment)?;
        self.apply_experiment(LifecycleEvent::RequestFinish { success: true }, now)?;
        self.apply_experiment(LifecycleEvent::FinishExperiment, now)
    }

    // -----------------------------------------------------------------------
    // Episode track
    // -----------------------------------------------------------------------

    /// Seed a new episode track and move it to `WaitingEpisode`.
    pub fn begin_episode(
        &mut self,
        occlusions: Vec<i32>,
        predator_spawn_location: Location2,
        now: f64,
    ) -> Result<ExperimentStatus> {
        self.ensure_open()?;
        if self.experiment.status() != ExperimentStatus::InExperiment {
            return Err(ProtocolError::InvalidTransition {
                from: self.experiment.status(),
                event: LifecycleEvent::RequestEpisode,
            });
        }
        if self.has_live_episode() {
            return Err(ProtocolError::EpisodeInProgress(self.info.name.clone()));
        }

        let mut track = Track::new(ExperimentStatus::InExperiment, now);
        let status = track.apply(LifecycleEvent::RequestEpisode, now)?;

        if let Some(previous) = self.episode.take() {
            self.archive.push(previous);
        }
        self.tracker.reset();
        let index = self.archive.len() as i32;
        self.episode = Some(Episode {
            index,
            track,
            started_at: now,
            occlusions,
            predator_spawn_location,
            trajectory: Trajectory::new(),
        });
        info!("Experiment '{}': episode {} requested", self.info.name, index);
        Ok(status)
    }

    pub fn apply_episode(&mut self, event: LifecycleEvent, now: f64) -> Result<ExperimentStatus> {
        self.ensure_open()?;
        let name = self.info.name.clone();
        let episode = self
            .episode
            .as_mut()
            .filter(|ep| ep.is_live())
            .ok_or_else(|| ProtocolError::NoEpisode(name.clone()))?;
        let from = episode.status();
        let to = episode.track.apply(event, now)?;
        info!(
            "Experiment '{}' episode {}: {} -> {}",
            name, episode.index, from, to
        );
        Ok(to)
    }

    /// `InEpisode | FailedEpisodeTimer → WaitingFinish* → FinishedEpisode*`.
    pub fn finish_episode(&mut self, now: f64) -> Result<ExperimentStatus> {
        let current = self
            .live_episode()
            .map(Episode::status)
            .ok_or_else(|| ProtocolError::NoEpisode(self.info.name.clone()))?;
        let success = current == ExperimentStatus::InEpisode;
        let request = LifecycleEvent::RequestFinish { success };
        let waiting = transition(current, request)?;
        transition(waiting, LifecycleEvent::FinishEpisode)?;
        self.apply_episode(request, now)?;
        self.apply_episode(LifecycleEvent::FinishEpisode, now)
    }

    // -----------------------------------------------------------------------
    // Routed events
    // -----------------------------------------------------------------------

    /// Apply an externally driven event to the track it belongs to.
    pub fn apply(&mut self, event: LifecycleEvent, now: f64) -> Result<ExperimentStatus> {
        use LifecycleEvent as E;
        match event {
            E::StartExperiment
            | E::StartExperimentFailed
            | E::FinishExperiment
            | E::FinishExperimentFailed
            | E::TimedOut(Scope::Experiment)
            | E::TrackingResetFailed
            | E::TrackingResetTimedOut => {
                self.ensure_open()?;
                self.apply_experiment(event, now)
            }
            E::RequestEpisode => self.begin_episode(Vec::new(), Location2::default(), now),
            E::StartEpisode
            | E::StartEpisodeFailed
            | E::EpisodeTimerExpired
            | E::FinishEpisode
            | E::FinishEpisodeFailed
            | E::TimedOut(Scope::Episode) => self.apply_episode(event, now),
            E::RequestFinish { .. } => {
                if self.has_live_episode() {
                    self.apply_episode(event, now)
                } else {
                    self.ensure_open()?;
                    self.apply_experiment(event, now)
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Motion capture
    // -----------------------------------------------------------------------

    fn recording_episode(&mut self) -> Result<&mut Episode> {
        self.ensure_open()?;
        let name = self.info.name.clone();
        self.episode
            .as_mut()
            .filter(|ep| ep.status() == ExperimentStatus::InEpisode)
            .ok_or(ProtocolError::NoEpisode(name))
    }

    pub fn record_step(&mut self, step: Step) -> Result<usize> {
        let episode = self.recording_episode()?;
        episode.trajectory.push(step);
        Ok(episode.trajectory.len())
    }

    /// Records a step only when the agent's pose changed. Returns whether a
    /// step was written.
    pub fn observe_agent(&mut self, state: AgentState) -> Result<bool> {
        self.recording_episode()?;
        let Some(step) = self.tracker.observe(state) else {
            return Ok(false);
        };
        self.recording_episode()?.trajectory.push(step);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Timeouts
    // -----------------------------------------------------------------------

    /// Force timeout transitions on tracks stuck past their deadline.
    /// Returns the statuses that were entered.
    pub fn expire(&mut self, now: f64, policy: &TimeoutPolicy) -> Vec<ExperimentStatus> {
        let mut entered = Vec::new();
        if self.is_terminated() {
            return entered;
        }

        let experiment_deadline = match self.experiment.status() {
            ExperimentStatus::WaitingExperiment => Some(policy.experiment_secs),
            ExperimentStatus::WaitingFinishSuccess | ExperimentStatus::WaitingFinishError => {
                Some(policy.finish_secs)
            }
            _ => None,
        };
        if let Some(limit) = experiment_deadline {
            if now - self.experiment.since() >= limit {
                warn!(
                    "Experiment '{}' timed out in {}",
                    self.info.name,
                    self.experiment.status()
                );
                if let Ok(status) =
                    self.apply_experiment(LifecycleEvent::TimedOut(Scope::Experiment), now)
                {
                    entered.push(status);
                }
                return entered;
            }
        }

        let duration = f64::from(self.info.duration);
        let overran = duration > 0.0 && now - self.info.started_at >= duration;
        let Some((status, since)) = self
            .live_episode()
            .map(|ep| (ep.status(), ep.track.since()))
        else {
            return entered;
        };

        let event = match status {
            ExperimentStatus::WaitingEpisode if now - since >= policy.episode_secs => {
                Some(LifecycleEvent::TimedOut(Scope::Episode))
            }
            ExperimentStatus::WaitingFinishSuccess | ExperimentStatus::WaitingFinishError
                if now - since >= policy.finish_secs =>
            {
                Some(LifecycleEvent::TimedOut(Scope::Episode))
            }
            ExperimentStatus::InEpisode if overran => Some(LifecycleEvent::EpisodeTimerExpired),
            _ => None,
        };
        if let Some(event) = event {
            warn!(
                "Experiment '{}' episode timed out in {}",
                self.info.name, status
            );
            if let Ok(status) = self.apply_episode(event, now) {
                entered.push(status);
            }
        }
        entered
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Whole-second UTC time for a unix timestamp; fractions are dropped.
pub fn utc_from_unix(unix_secs: f64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(unix_secs.floor() as i64, 0).unwrap_or_default()
}

/// `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_start_date(unix_secs: f64) -> String {
    utc_from_unix(unix_secs)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// `YYYYMMDD_HHMM` (UTC), used inside experiment names.
pub fn name_stamp(unix_secs: f64) -> String {
    utc_from_unix(unix_secs).format("%Y%m%d_%H%M").to_string()
}
