//! Timeout watchdog – runs [`ExperimentService::expire`] on a fixed period,
//! then drops sessions past their retention with
//! [`ExperimentService::purge_retired`].
//!
//! The state machine only says which error state a timeout produces; this
//! task is the clock that fires it.

use crate::service::ExperimentService;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct TimeoutWatchdog {
    service: Arc<ExperimentService>,
    interval: Duration,
}

impl TimeoutWatchdog {
    pub fn new(service: Arc<ExperimentService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Sweep until `shutdown` flips to `true` or its sender is dropped.
    /// Returns the number of sweeps performed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut sweeps = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = timer.tick() => {
                    sweeps += 1;
                    for (name, status) in self.service.expire() {
                        warn!("Watchdog: experiment '{}' entered {}", name, status);
                    }
                    self.service.purge_retired();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Timeout watchdog stopped after {} sweeps", sweeps);
        sweeps
    }
}
