//! Session record and start date tests

#[cfg(test)]
mod tests {
    use experiment_session::session::{
        format_start_date, name_stamp, utc_from_unix, Session, SessionInfo,
    };
    use experiment_session::status::{ExperimentStatus, LifecycleEvent};
    use experiment_session::types::Location2;
    use experiment_session::world::{CellGroup, WorldInfo};

    const T0: f64 = 1_704_110_400.0;

    fn make_session(duration: i32) -> Session {
        Session::new(SessionInfo {
            name: "P_20240101_1200_vr_dude_21_05_S".into(),
            world: WorldInfo::default(),
            subject_name: "vr_dude".into(),
            start_date: format_start_date(T0),
            started_at: T0,
            duration,
            rewards: Vec::new(),
            rewards_cells: CellGroup::default(),
            participant_id: 1,
        })
    }

    // -----------------------------------------------------------------------
    // Start dates
    // -----------------------------------------------------------------------

    #[test]
    fn epoch() {
        assert_eq!(format_start_date(0.0), "1970-01-01 00:00:00");
        assert_eq!(utc_from_unix(0.0).timestamp(), 0);
    }

    #[test]
    fn leap_day() {
        assert_eq!(format_start_date(1_709_251_199.0), "2024-02-29 23:59:59");
        assert_eq!(format_start_date(1_709_251_200.0), "2024-03-01 00:00:00");
    }

    #[test]
    fn fractional_seconds_truncate() {
        assert_eq!(format_start_date(T0 + 0.9), "2024-01-01 12:00:00");
        assert_eq!(name_stamp(T0 + 59.0), "20240101_1200");
        assert_eq!(name_stamp(T0 + 60.0), "20240101_1201");
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    #[test]
    fn new_session_waits_for_start() {
        let session = make_session(600);
        assert_eq!(session.status(), ExperimentStatus::WaitingExperiment);
        assert_eq!(session.episode_count(), 0);
        assert_eq!(session.terminated_at(), None);
    }

    #[test]
    fn remaining_time_never_goes_negative() {
        let session = make_session(600);
        assert_eq!(session.remaining_time(T0 + 100.0), 500.0);
        assert_eq!(session.remaining_time(T0 + 1000.0), 0.0);
    }

    #[test]
    fn episodes_are_archived_on_next_start() {
        let mut session = make_session(0);
        session
            .apply_experiment(LifecycleEvent::StartExperiment, T0)
            .unwrap();

        session
            .begin_episode(vec![3], Location2::new(0.9, 0.5), T0 + 1.0)
            .unwrap();
        session
            .apply_episode(LifecycleEvent::StartEpisode, T0 + 1.0)
            .unwrap();
        session.finish_episode(T0 + 2.0).unwrap();

        session
            .begin_episode(Vec::new(), Location2::default(), T0 + 3.0)
            .unwrap();
        assert_eq!(session.archived_episodes().len(), 1);
        assert_eq!(
            session.archived_episodes()[0].status(),
            ExperimentStatus::FinishedEpisodeSuccess
        );
        assert_eq!(session.episode().unwrap().index, 1);
        assert_eq!(session.episode_count(), 2);
        assert_eq!(session.status(), ExperimentStatus::WaitingEpisode);
    }

    #[test]
    fn terminated_at_records_the_final_transition() {
        let mut session = make_session(0);
        session
            .apply_experiment(LifecycleEvent::StartExperiment, T0)
            .unwrap();
        session.finish(T0 + 42.0).unwrap();
        assert!(session.is_terminated());
        assert_eq!(session.terminated_at(), Some(T0 + 42.0));
    }
}
