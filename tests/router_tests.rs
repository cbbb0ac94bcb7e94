//! Router dispatch tests

#[cfg(test)]
mod tests {
    use experiment_session::error::ProtocolError;
    use experiment_session::protocol::{subjects, Reply};
    use experiment_session::status::ExperimentStatus;
    use experiment_session::{ExperimentService, ManualClock, Router, ServiceConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn make_router() -> Router {
        let clock = Arc::new(ManualClock::new(1_704_110_400.0));
        let service = ExperimentService::with_clock(ServiceConfig::default(), clock);
        Router::new(Arc::new(service))
    }

    fn reply(bytes: &[u8]) -> Reply {
        serde_json::from_slice(bytes).unwrap()
    }

    fn start(router: &Router) -> String {
        let r = reply(&router.handle(
            subjects::START_EXPERIMENT,
            r#"{"prefix": "P", "suffix": "S", "duration": 600}"#,
        ));
        assert!(r.success, "{:?}", r.error);
        r.result.unwrap()["experiment_name"]
            .as_str()
            .unwrap()
            .to_string()
    }

    // -----------------------------------------------------------------------
    // Subjects
    // -----------------------------------------------------------------------

    #[test]
    fn start_experiment_reply_echoes_request() {
        let router = make_router();
        let r = reply(&router.handle(
            subjects::START_EXPERIMENT,
            r#"{"prefix": "P", "suffix": "S", "duration": 1800}"#,
        ));
        assert!(r.success);
        assert_eq!(r.subject, "start_experiment");
        let result = r.result.unwrap();
        assert_eq!(result["subject_name"], "vr_dude");
        assert_eq!(result["duration"], 1800);
        assert_eq!(result["world"]["occlusions"], "21_05");
        assert_eq!(result["start_date"], "2024-01-01 12:00:00");
    }

    #[test]
    fn episode_round_over_subjects() {
        let router = make_router();
        let name = start(&router);
        let body = json!({ "experiment_name": name }).to_string();

        let r = reply(&router.handle(subjects::START_EPISODE, &body));
        assert!(r.success);
        assert!(r.result.unwrap()["predator_spawn_location"].is_object());

        let step = json!({
            "experiment_name": name,
            "step": { "agent_name": "prey", "frame": 1, "location": { "x": 0.5, "y": 0.5 } }
        })
        .to_string();
        let r = reply(&router.handle(subjects::RECORD_STEP, &step));
        assert!(r.success);
        assert!(r.result.is_none());

        let r = reply(&router.handle(subjects::FINISH_EPISODE, &body));
        assert_eq!(r.result.unwrap()["participant_id"], 1);

        let r = reply(&router.handle(subjects::GET_EXPERIMENT, &body));
        assert_eq!(r.result.unwrap()["episode_count"], 1);

        let r = reply(&router.handle(subjects::FINISH_EXPERIMENT, &body));
        assert!(r.success);
        assert_eq!(
            router.service().status(&name).unwrap(),
            ExperimentStatus::FinishedExperiment
        );
    }

    #[test]
    fn ghost_updates_have_no_result() {
        let router = make_router();
        let r = reply(&router.handle(
            subjects::UPDATE_GHOST_MOVEMENT,
            r#"{"forward": 0.02, "rotation": 15}"#,
        ));
        assert!(r.success);
        assert!(r.result.is_none());
        assert_eq!(router.service().ghost_trajectory().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_subject_is_rejected() {
        let router = make_router();
        assert!(matches!(
            router.dispatch("launch_rocket", "{}"),
            Err(ProtocolError::UnknownSubject(ref s)) if s == "launch_rocket"
        ));
        let r = reply(&router.handle("launch_rocket", "{}"));
        assert!(!r.success);
        assert!(r.error.unwrap().contains("launch_rocket"));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let router = make_router();
        assert!(matches!(
            router.dispatch(subjects::START_EPISODE, "{not json"),
            Err(ProtocolError::Decode(_))
        ));
        // valid JSON, wrong shape
        assert!(matches!(
            router.dispatch(subjects::START_EPISODE, r#"{"experiment_name": 7}"#),
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn mismatched_rewards_reply_failure() {
        let router = make_router();
        let r = reply(&router.handle(
            subjects::START_EXPERIMENT,
            r#"{"rewards_cells": ["1", "2"], "rewards_orientations": [0]}"#,
        ));
        assert!(!r.success);
        assert!(r.result.is_none());
        assert!(router.service().active_experiments().is_empty());
    }

    #[test]
    fn missing_name_is_rejected() {
        let router = make_router();
        let r = reply(&router.handle(subjects::GET_EXPERIMENT, r#"{"experiment_name": "  "}"#));
        assert!(!r.success);
        assert_eq!(
            r.error.unwrap(),
            ProtocolError::MissingExperimentName.to_string()
        );
    }

    // -----------------------------------------------------------------------
    // Envelopes
    // -----------------------------------------------------------------------

    #[test]
    fn request_envelope_routes_by_subject() {
        let router = make_router();
        let line = json!({
            "subject": "start_experiment",
            "body": { "prefix": "env" }
        })
        .to_string();
        let r = reply(&router.handle_request(&line));
        assert!(r.success);
        assert_eq!(r.subject, "start_experiment");
        assert!(r.result.unwrap()["experiment_name"]
            .as_str()
            .unwrap()
            .starts_with("env_20240101_1200_"));
    }

    #[test]
    fn broken_envelope_replies_without_subject() {
        let router = make_router();
        let r = reply(&router.handle_request("garbage"));
        assert!(!r.success);
        assert_eq!(r.subject, "");
        assert!(r.error.is_some());
    }
}
