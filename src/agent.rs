//! Agent motion capture: trajectories, change-detecting trackers and the
//! ghost playback agent.

use crate::protocol::UpdateGhostMovement;
use crate::types::{AgentState, Location2, Step};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const GHOST_AGENT_NAME: &str = "ghost";

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

/// Append-only step log for one episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Trajectory {
    steps: Vec<Step>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn last_frame(&self) -> Option<i32> {
        self.steps.last().map(|s| s.frame)
    }

    /// Steps recorded for a single agent, in order.
    pub fn for_agent<'a>(&'a self, agent_name: &'a str) -> impl Iterator<Item = &'a Step> {
        self.steps.iter().filter(move |s| s.agent_name == agent_name)
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Remembers the last pose per agent and emits a step only on movement.
#[derive(Debug, Default)]
pub struct AgentTracker {
    last: HashMap<String, AgentState>,
}

impl AgentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(step)` when `state` differs from the previous pose of the same
    /// agent (or is the first one seen), `None` when it did not move.
    pub fn observe(&mut self, state: AgentState) -> Option<Step> {
        if let Some(prev) = self.last.get(&state.agent_name) {
            if *prev == state {
                return None;
            }
        }
        let step = Step::from(&state);
        self.last.insert(state.agent_name.clone(), state);
        Some(step)
    }

    pub fn last_state(&self, agent_name: &str) -> Option<&AgentState> {
        self.last.get(agent_name)
    }

    /// Forget every pose, e.g. after tracking was re-synchronised.
    pub fn reset(&mut self) {
        self.last.clear();
    }
}

// ---------------------------------------------------------------------------
// Ghost
// ---------------------------------------------------------------------------

/// Playback agent driven by forward/rotation deltas.
#[derive(Debug, Clone, Default)]
pub struct GhostAgent {
    location: Location2,
    /// Heading in degrees.
    heading: f32,
    frame: i32,
}

impl GhostAgent {
    pub fn new(location: Location2, heading: f32) -> Self {
        Self {
            location,
            heading,
            frame: 0,
        }
    }

    /// Continue playback from a known frame.
    pub fn resume(location: Location2, heading: f32, frame: i32) -> Self {
        Self {
            location,
            heading,
            frame,
        }
    }

    pub fn frame(&self) -> i32 {
        self.frame
    }

    pub fn location(&self) -> Location2 {
        self.location
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Rotate first, then advance along the new heading.
    pub fn apply(&mut self, update: &UpdateGhostMovement, time_stamp: f32) -> Step {
        self.heading = (self.heading + update.rotation).rem_euclid(360.0);
        let radians = self.heading.to_radians();
        self.location.x += update.forward * radians.cos();
        self.location.y += update.forward * radians.sin();
        self.frame = self.frame.wrapping_add(1);

        Step {
            location: self.location,
            rotation: self.heading,
            frame: self.frame,
            time_stamp,
            agent_name: GHOST_AGENT_NAME.into(),
            data: String::new(),
        }
    }
}
