//! Experiment Session
//!
//! Session protocol, lifecycle state machine and world grid payloads for
//! remote behavioural experiments: a subject application starts and finishes
//! experiments and episodes against an orchestrator, receives the world
//! layout, and reports agent motion.
//!
//! ## Architecture
//!
//! ```text
//! Router  (router.rs)            ← subject + encoded body in, encoded Reply out
//!   └── ExperimentService  (service.rs)   ← per-session locks, registry
//!         ├── Session  (session.rs)       ← experiment + episode tracks
//!         │     └── transition  (status.rs)
//!         ├── ActiveExperiments  (registry.rs)
//!         └── WorldLayout  (world.rs)
//! TimeoutWatchdog  (watchdog.rs)  ← drives ExperimentService::expire
//! ```
//!
//! Everything a subject application needs to talk the protocol (message
//! types, geometry, world model, parameters, the pure state machine) builds
//! without the `server` feature.

// Protocol types are always available (no server feature needed).
pub mod agent;
pub mod error;
pub mod parameters;
pub mod protocol;
pub mod registry;
pub mod status;
pub mod types;
pub mod world;

// Orchestrator-side modules require the `server` feature.
#[cfg(feature = "server")]
pub mod router;
#[cfg(feature = "server")]
pub mod service;
#[cfg(feature = "server")]
pub mod session;
#[cfg(feature = "server")]
pub mod settings;
#[cfg(feature = "server")]
pub mod watchdog;

// Convenience re-exports (server only)
#[cfg(feature = "server")]
pub use router::Router;
#[cfg(feature = "server")]
pub use service::{Clock, ExperimentService, ManualClock, ServiceStats, SystemClock};
#[cfg(feature = "server")]
pub use session::Session;
#[cfg(feature = "server")]
pub use settings::{ServiceConfig, TimeoutPolicy};
#[cfg(feature = "server")]
pub use watchdog::TimeoutWatchdog;
pub use error::ProtocolError;
pub use parameters::ExperimentParameters;
pub use registry::ActiveExperiments;
pub use status::{transition, ExperimentStatus, LifecycleEvent, Scope};
pub use types::{AgentState, Coordinates, Location2, Location3, Rotation3, Step};
pub use world::{Cell, CellGroup, WorldInfo, WorldLayout};
