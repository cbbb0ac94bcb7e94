//! Timeout watchdog tests

#[cfg(test)]
mod tests {
    use experiment_session::status::{ExperimentStatus, LifecycleEvent};
    use experiment_session::protocol::{FinishExperimentRequest, StartExperimentRequest};
    use experiment_session::{ExperimentService, ManualClock, ServiceConfig, TimeoutWatchdog};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    fn stalled_service() -> (Arc<ExperimentService>, String) {
        let clock = Arc::new(ManualClock::new(0.0));
        let svc = ExperimentService::with_clock(ServiceConfig::default(), clock.clone());
        let name = svc
            .start_experiment(&StartExperimentRequest::default())
            .unwrap()
            .experiment_name;
        svc.apply(&name, LifecycleEvent::RequestEpisode).unwrap();
        clock.advance(60.0);
        (Arc::new(svc), name)
    }

    #[test]
    fn stops_immediately_when_already_shut_down() {
        let (svc, name) = stalled_service();
        let (tx, rx) = watch::channel(true);
        let sweeps = tokio_test::block_on(
            TimeoutWatchdog::new(svc.clone(), Duration::from_millis(5)).run(rx),
        );
        drop(tx);
        assert_eq!(sweeps, 0);
        assert_eq!(svc.status(&name).unwrap(), ExperimentStatus::WaitingEpisode);
    }

    #[test]
    fn sweep_times_out_waiting_episode() {
        let (svc, name) = stalled_service();
        let (tx, rx) = watch::channel(false);
        let watchdog = TimeoutWatchdog::new(svc.clone(), Duration::from_millis(5));

        let (sweeps, _) = tokio_test::block_on(async move {
            tokio::join!(watchdog.run(rx), async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                let _ = tx.send(true);
            })
        });

        assert!(sweeps >= 1);
        assert_eq!(
            svc.status(&name).unwrap(),
            ExperimentStatus::ErrorTimedOutEpisode
        );
        assert!(svc.is_active(&name));
    }

    #[test]
    fn dropped_sender_stops_the_loop() {
        let (svc, _) = stalled_service();
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let sweeps = tokio_test::block_on(
            TimeoutWatchdog::new(svc, Duration::from_secs(3600)).run(rx),
        );
        assert!(sweeps <= 1);
    }

    #[test]
    fn sweep_drops_retired_sessions() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut config = ServiceConfig::default();
        config.max_active_experiments = 1;
        config.retention_secs = 10.0;
        let svc = Arc::new(ExperimentService::with_clock(config, clock.clone()));

        let name = svc
            .start_experiment(&StartExperimentRequest::default())
            .unwrap()
            .experiment_name;
        for _ in 0..100 {
            assert!(svc
                .start_experiment(&StartExperimentRequest::default())
                .is_err());
        }
        svc.finish_experiment(&FinishExperimentRequest {
            experiment_name: name.clone(),
        })
        .unwrap();
        clock.advance(10.0);

        let (tx, rx) = watch::channel(false);
        let watchdog = TimeoutWatchdog::new(svc.clone(), Duration::from_millis(5));
        tokio_test::block_on(async move {
            tokio::join!(watchdog.run(rx), async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let _ = tx.send(true);
            })
        });

        assert_eq!(svc.stats().sessions, 0);
        assert!(svc.status(&name).is_err());
    }
}
