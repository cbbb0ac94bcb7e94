//! Geometry primitive and agent record tests

#[cfg(test)]
mod tests {
    use experiment_session::types::{
        AgentState, Coordinates, Location2, Location3, Rotation3, Step,
    };

    // -----------------------------------------------------------------------
    // Strict pose equality
    // -----------------------------------------------------------------------

    #[test]
    fn location3_equality_is_componentwise() {
        let a = Location3::new(1.0, 2.0, 3.0);
        assert_eq!(a, Location3::new(1.0, 2.0, 3.0));
        assert_ne!(a, Location3::new(1.0, 2.0, 3.000001));
        assert_ne!(a, Location3::new(1.0, 2.5, 3.0));
    }

    #[test]
    fn inequality_is_negated_equality() {
        let samples = [
            Location3::new(0.0, 0.0, 0.0),
            Location3::new(-0.0, 0.0, 0.0),
            Location3::new(f32::NAN, 0.0, 0.0),
            Location3::new(0.1 + 0.2, 0.0, 0.0),
            Location3::new(0.3, 0.0, 0.0),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(a != b, !(a == b));
            }
        }
    }

    #[test]
    fn no_tolerance_is_applied() {
        let a = Rotation3::new(0.0, 0.0, 90.0);
        let b = Rotation3::new(0.0, 0.0, 90.0 + f32::EPSILON * 64.0);
        assert_ne!(a, b);
        assert!(a.approx_eq(&b, 1e-3));
    }

    #[test]
    fn ieee_edge_cases() {
        // IEEE comparison: signed zeros are equal, NaN never equals itself.
        assert_eq!(Location3::new(0.0, 0.0, 0.0), Location3::new(-0.0, 0.0, 0.0));
        let nan = Rotation3::new(f32::NAN, 0.0, 0.0);
        assert_ne!(nan, nan);
    }

    #[test]
    fn location_converts_from_tuple() {
        let l: Location3 = (1.0, 2.0, 3.0).into();
        assert_eq!(l, Location3::new(1.0, 2.0, 3.0));
        assert_eq!(l.planar(), Location2::new(1.0, 2.0));
    }

    #[test]
    fn planar_distance() {
        let a = Location2::new(0.0, 0.0);
        let b = Location2::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn coordinates_display() {
        assert_eq!(Coordinates::new(-2, 4).to_string(), "[-2,4]");
    }

    // -----------------------------------------------------------------------
    // Agent state
    // -----------------------------------------------------------------------

    #[test]
    fn agent_state_equality_ignores_frame_time_and_name() {
        let a = AgentState::new(
            1,
            0.5,
            "prey",
            Location3::new(1.0, 2.0, 0.0),
            Rotation3::new(0.0, 0.0, 45.0),
        );
        let b = AgentState::new(
            99,
            12.0,
            "predator",
            Location3::new(1.0, 2.0, 0.0),
            Rotation3::new(0.0, 0.0, 45.0),
        );
        assert_eq!(a, b);

        let moved = AgentState {
            location: Location3::new(1.0, 2.0, 0.1),
            ..a.clone()
        };
        assert_ne!(a, moved);

        let turned = AgentState {
            rotation: Rotation3::new(0.0, 0.0, 46.0),
            ..a.clone()
        };
        assert_ne!(a, turned);
    }

    #[test]
    fn step_from_agent_state_keeps_planar_pose_and_yaw() {
        let state = AgentState::new(
            7,
            1.25,
            "prey",
            Location3::new(0.4, 0.6, 1.7),
            Rotation3::new(5.0, 10.0, 270.0),
        );
        let step = Step::from(&state);
        assert_eq!(step.location, Location2::new(0.4, 0.6));
        assert_eq!(step.rotation, 270.0);
        assert_eq!(step.frame, 7);
        assert_eq!(step.time_stamp, 1.25);
        assert_eq!(step.agent_name, "prey");
        assert!(step.data.is_empty());
    }

    #[test]
    fn step_data_passes_through_codec() {
        let step = Step {
            location: Location2::new(0.1, 0.2),
            rotation: 90.0,
            frame: 3,
            time_stamp: 0.1,
            agent_name: "prey".into(),
            data: "{\"puffed\":true}".into(),
        };
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }
}
