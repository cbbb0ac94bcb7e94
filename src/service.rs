//! ExperimentService – session lifecycle, registry bookkeeping, motion capture.
//!
//! ## Locking
//!
//! * `sessions` map: `RwLock`, held only to look up or insert a session.
//! * each session: its own `Mutex`, so operations on one experiment are
//!   serialised while different experiments proceed in parallel.
//! * `registry`: one `Mutex`; capacity check and insert happen under it.
//!
//! Order when nesting: sessions map → session → registry.

use crate::agent::{GhostAgent, Trajectory};
use crate::error::{ProtocolError, Result};
use crate::parameters::ExperimentParameters;
use crate::protocol::{
    ExperimentScoped, FinishEpisodeRequest, FinishEpisodeResponse, FinishExperimentRequest,
    GetExperimentRequest, GetExperimentResponse, RecordStep, StartEpisodeRequest,
    StartEpisodeResponse, StartExperimentRequest, StartExperimentResponse, UpdateGhostMovement,
};
use crate::registry::ActiveExperiments;
use crate::session::{format_start_date, name_stamp, Session, SessionInfo};
use crate::settings::ServiceConfig;
use crate::status::{ExperimentStatus, LifecycleEvent};
use crate::types::{AgentState, Step};
use crate::world::{CellGroup, WorldLayout};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of wall-clock time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Hand-driven clock for replays and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceStats {
    pub active_experiments: usize,
    pub capacity: usize,
    pub sessions: usize,
    pub terminated_sessions: usize,
    pub ghost_steps: usize,
}

struct GhostState {
    agent: GhostAgent,
    trajectory: Trajectory,
    started_at: f64,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct ExperimentService {
    config: ServiceConfig,
    layout: WorldLayout,
    registry: Mutex<ActiveExperiments>,
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    parameters: RwLock<ExperimentParameters>,
    ghost: Mutex<GhostState>,
    clock: Arc<dyn Clock>,
    next_participant_id: AtomicI32,
}

impl ExperimentService {
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        let layout = WorldLayout::hexagonal(config.world_radius);
        let ghost_start = layout.entrance().map(|c| c.location).unwrap_or_default();
        let now = clock.now();
        Self {
            registry: Mutex::new(ActiveExperiments::with_capacity(
                config.max_active_experiments,
            )),
            sessions: RwLock::new(HashMap::new()),
            parameters: RwLock::new(config.parameters.clone()),
            ghost: Mutex::new(GhostState {
                agent: GhostAgent::new(ghost_start, 0.0),
                trajectory: Trajectory::new(),
                started_at: now,
            }),
            layout,
            config,
            clock,
            next_participant_id: AtomicI32::new(1),
        }
    }

    pub fn layout(&self) -> &WorldLayout {
        &self.layout
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    pub fn parameters(&self) -> ExperimentParameters {
        self.parameters.read().clone()
    }

    pub fn update_parameters(&self, f: impl FnOnce(&mut ExperimentParameters)) {
        f(&mut self.parameters.write());
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    fn session(&self, name: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ProtocolError::UnknownExperiment(name.to_string()))
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.registry.lock().contains(name)
    }

    pub fn active_experiments(&self) -> Vec<String> {
        self.registry.lock().names().to_vec()
    }

    pub fn status(&self, name: &str) -> Result<ExperimentStatus> {
        Ok(self.session(name)?.lock().status())
    }

    /// Steps of the current (or most recent) episode.
    pub fn trajectory(&self, name: &str) -> Result<Trajectory> {
        let session = self.session(name)?;
        let session = session.lock();
        session
            .episode()
            .map(|ep| ep.trajectory.clone())
            .ok_or_else(|| ProtocolError::NoEpisode(name.to_string()))
    }

    pub fn ghost_trajectory(&self) -> Trajectory {
        self.ghost.lock().trajectory.clone()
    }

    pub fn stats(&self) -> ServiceStats {
        let (sessions, terminated_sessions) = {
            let map = self.sessions.read();
            let terminated = map.values().filter(|s| s.lock().is_terminated()).count();
            (map.len(), terminated)
        };
        let registry = self.registry.lock();
        ServiceStats {
            active_experiments: registry.len(),
            capacity: registry.capacity(),
            sessions,
            terminated_sessions,
            ghost_steps: self.ghost.lock().trajectory.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Get experiment
    // -----------------------------------------------------------------------

    pub fn get_experiment(&self, req: &GetExperimentRequest) -> Result<GetExperimentResponse> {
        let name = req.validated_name()?;
        let session = self.session(name)?;
        let session = session.lock();
        let info = session.info();
        Ok(GetExperimentResponse {
            experiment_name: info.name.clone(),
            world_info: info.world.clone(),
            start_date: info.start_date.clone(),
            subject_name: info.subject_name.clone(),
            duration: info.duration,
            remaining_time: session.remaining_time(self.clock.now()),
            episode_count: session.episode_count(),
            rewards_cells: info.rewards_cells.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Start experiment
    // -----------------------------------------------------------------------

    pub fn start_experiment(
        &self,
        req: &StartExperimentRequest,
    ) -> Result<StartExperimentResponse> {
        let rewards = req.reward_placements()?;
        let rewards_cells = self.resolve_rewards(req)?;

        let now = self.clock.now();
        let start_date = format_start_date(now);
        let base_name = format!(
            "{}_{}_{}_{}_{}",
            req.prefix,
            name_stamp(now),
            req.subject_name,
            req.world.occlusions,
            req.suffix
        );

        let mut sessions = self.sessions.write();
        let name = unique_name(&base_name, |n| sessions.contains_key(n));

        let mut session = Session::new(SessionInfo {
            name: name.clone(),
            world: req.world.clone(),
            subject_name: req.subject_name.clone(),
            start_date: start_date.clone(),
            started_at: now,
            duration: req.duration,
            rewards,
            rewards_cells,
            participant_id: self.next_participant_id.fetch_add(1, Ordering::Relaxed),
        });

        let added = {
            let mut registry = self.registry.lock();
            if registry.add(&name) {
                Ok(())
            } else {
                Err(registry.capacity())
            }
        };

        match added {
            Ok(()) => {
                session.apply_experiment(LifecycleEvent::StartExperiment, now)?;
                sessions.insert(name.clone(), Arc::new(Mutex::new(session)));
                info!("Started experiment '{}' ({})", name, req.world);
                Ok(StartExperimentResponse {
                    experiment_name: name,
                    start_date,
                    world: req.world.clone(),
                    subject_name: req.subject_name.clone(),
                    duration: req.duration,
                })
            }
            Err(capacity) => {
                // Not registered; the session is dropped here.
                let status = session.apply_experiment(LifecycleEvent::StartExperimentFailed, now)?;
                warn!("Experiment '{}' not started: {}", name, status);
                Err(ProtocolError::RegistryFull { capacity })
            }
        }
    }

    fn resolve_rewards(&self, req: &StartExperimentRequest) -> Result<CellGroup> {
        let mut ids = Vec::with_capacity(req.rewards_cells.len());
        for raw in &req.rewards_cells {
            match raw.trim().parse::<i32>() {
                Ok(id) if self.layout.cells.get(id).is_some() => ids.push(id),
                _ if self.config.strict_rewards => {
                    return Err(ProtocolError::UnknownRewardCell(raw.clone()));
                }
                _ => warn!("Reward cell '{}' is not a world cell id, skipping", raw),
            }
        }
        let occlusions = self.config.occlusions.resolve(&req.world.occlusions);
        self.layout.with_occlusions(&occlusions).select(&ids)
    }

    // -----------------------------------------------------------------------
    // Finish experiment
    // -----------------------------------------------------------------------

    pub fn finish_experiment(&self, req: &FinishExperimentRequest) -> Result<()> {
        let name = req.validated_name()?;
        let session = self.session(name)?;
        let mut session = session.lock();
        session.finish(self.clock.now())?;
        self.registry.lock().remove(name);
        info!("Finished experiment '{}'", name);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Episodes
    // -----------------------------------------------------------------------

    pub fn start_episode(&self, req: &StartEpisodeRequest) -> Result<StartEpisodeResponse> {
        let name = req.validated_name()?;
        let session = self.session(name)?;
        let mut session = session.lock();
        if !session.is_terminated() && !self.registry.lock().contains(name) {
            return Err(ProtocolError::UnknownExperiment(name.to_string()));
        }

        let now = self.clock.now();
        let occlusions = self.config.occlusions.resolve(&session.info().world.occlusions);
        let cells = self.layout.with_occlusions(&occlusions);
        let spawn = self.layout.predator_spawn(&cells);

        session.begin_episode(occlusions.clone(), spawn.unwrap_or_default(), now)?;
        let Some(predator_spawn_location) = spawn else {
            session.apply_episode(LifecycleEvent::StartEpisodeFailed, now)?;
            return Err(ProtocolError::NoSpawnLocation);
        };
        session.apply_episode(LifecycleEvent::StartEpisode, now)?;

        Ok(StartEpisodeResponse {
            occlusions,
            predator_spawn_location,
        })
    }

    pub fn finish_episode(&self, req: &FinishEpisodeRequest) -> Result<FinishEpisodeResponse> {
        let name = req.validated_name()?;
        if !self.is_active(name) {
            warn!("Finish episode for inactive experiment '{}'", name);
            return Err(ProtocolError::UnknownExperiment(name.to_string()));
        }
        let session = self.session(name)?;
        let mut session = session.lock();
        session.finish_episode(self.clock.now())?;
        Ok(FinishEpisodeResponse {
            participant_id: session.info().participant_id,
        })
    }

    // -----------------------------------------------------------------------
    // Motion capture
    // -----------------------------------------------------------------------

    pub fn update_ghost(&self, update: &UpdateGhostMovement) -> Step {
        let now = self.clock.now();
        let mut ghost = self.ghost.lock();
        let time_stamp = (now - ghost.started_at) as f32;
        let step = ghost.agent.apply(update, time_stamp);
        ghost.trajectory.push(step.clone());
        debug!("Ghost moved to {} heading {:.1}", step.location, step.rotation);
        step
    }

    pub fn record_step(&self, req: RecordStep) -> Result<usize> {
        let name = req.validated_name()?.to_string();
        let session = self.session(&name)?;
        let count = session.lock().record_step(req.step)?;
        debug!("Experiment '{}': {} steps", name, count);
        Ok(count)
    }

    pub fn observe_agent(&self, name: &str, state: AgentState) -> Result<bool> {
        self.session(name)?.lock().observe_agent(state)
    }

    // -----------------------------------------------------------------------
    // External transitions
    // -----------------------------------------------------------------------

    /// Drive a session with an event from an external collaborator (engine,
    /// tracker, timer).
    pub fn apply(&self, name: &str, event: LifecycleEvent) -> Result<ExperimentStatus> {
        let session = self.session(name)?;
        let mut session = session.lock();
        let status = session.apply(event, self.clock.now())?;
        if session.is_terminated() {
            self.registry.lock().remove(name);
        }
        Ok(status)
    }

    /// Timeout sweep. Returns `(experiment, entered status)` for every forced
    /// transition.
    pub fn expire(&self) -> Vec<(String, ExperimentStatus)> {
        let now = self.clock.now();
        let sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        let mut expired = Vec::new();
        for session in sessions {
            let mut session = session.lock();
            for status in session.expire(now, &self.config.timeouts) {
                expired.push((session.name().to_string(), status));
            }
            if session.is_terminated() && self.registry.lock().remove(session.name()) {
                warn!("Evicted timed out experiment '{}'", session.name());
            }
        }
        expired
    }

    /// Drop terminated sessions. Returns how many were removed.
    pub fn purge_terminated(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.lock().is_terminated());
        before - sessions.len()
    }

    /// Drop sessions that have been terminal for at least
    /// `retention_secs`. Returns how many were removed.
    pub fn purge_retired(&self) -> usize {
        let now = self.clock.now();
        let retention = self.config.retention_secs;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| match s.lock().terminated_at() {
            Some(at) => now - at < retention,
            None => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Purged {} retired sessions", removed);
        }
        removed
    }
}

/// `base`, or `base_2`, `base_3`, … whichever is free first.
fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
