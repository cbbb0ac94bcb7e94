//! Core geometry and agent-pose types shared across all modules.
//!
//! Grid-space ([`Coordinates`]) and continuous-space ([`Location2`]) positions
//! are distinct types on purpose: there is no `From` between them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Planar positions
// ---------------------------------------------------------------------------

/// Continuous 2D position in engine units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Location2 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl Location2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Location2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::fmt::Display for Location2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Integer grid coordinates of a cell.
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl Coordinates {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// 3D pose
// ---------------------------------------------------------------------------
//
// Equality on Location3 / Rotation3 is exact IEEE comparison with no
// tolerance. It answers "did the agent move since the last tick", so two poses
// produced on different platforms may compare unequal. Use `approx_eq` when a
// tolerance is wanted.

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Location3 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Location3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn approx_eq(&self, other: &Location3, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }

    /// Drops the vertical component.
    pub fn planar(&self) -> Location2 {
        Location2::new(self.x, self.y)
    }
}

impl From<(f32, f32, f32)> for Location3 {
    fn from((x, y, z): (f32, f32, f32)) -> Self {
        Self::new(x, y, z)
    }
}

impl std::fmt::Display for Location3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Euler rotation in degrees.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rotation3 {
    #[serde(default)]
    pub roll: f32,
    #[serde(default)]
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
}

impl Rotation3 {
    pub fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn approx_eq(&self, other: &Rotation3, tolerance: f32) -> bool {
        (self.roll - other.roll).abs() <= tolerance
            && (self.pitch - other.pitch).abs() <= tolerance
            && (self.yaw - other.yaw).abs() <= tolerance
    }
}

impl From<(f32, f32, f32)> for Rotation3 {
    fn from((roll, pitch, yaw): (f32, f32, f32)) -> Self {
        Self::new(roll, pitch, yaw)
    }
}

// ---------------------------------------------------------------------------
// Agent records
// ---------------------------------------------------------------------------

/// Timestamped pose of a tracked agent.
///
/// Two states are equal when their location and rotation are equal; `frame`,
/// `time_stamp` and `agent_name` are ignored so the comparison reads as
/// "same pose".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub frame: i32,
    #[serde(default)]
    pub time_stamp: f32,
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub location: Location3,
    #[serde(default)]
    pub rotation: Rotation3,
}

impl AgentState {
    pub fn new(
        frame: i32,
        time_stamp: f32,
        agent_name: impl Into<String>,
        location: Location3,
        rotation: Rotation3,
    ) -> Self {
        Self {
            frame,
            time_stamp,
            agent_name: agent_name.into(),
            location,
            rotation,
        }
    }
}

impl PartialEq for AgentState {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.rotation == other.rotation
    }
}

/// One logged motion sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Step {
    #[serde(default)]
    pub location: Location2,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub frame: i32,
    /// Seconds since the episode started.
    #[serde(default)]
    pub time_stamp: f32,
    #[serde(default)]
    pub agent_name: String,
    /// Free-form annotation, passed through untouched.
    #[serde(default)]
    pub data: String,
}

impl From<&AgentState> for Step {
    fn from(state: &AgentState) -> Self {
        Self {
            location: state.location.planar(),
            rotation: state.rotation.yaw,
            frame: state.frame,
            time_stamp: state.time_stamp,
            agent_name: state.agent_name.clone(),
            data: String::new(),
        }
    }
}
