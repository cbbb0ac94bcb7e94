//! Experiment parameter tests

#[cfg(test)]
mod tests {
    use experiment_session::parameters::{
        metric_to_canonical, ExperimentParameters, METRIC_PER_CANONICAL,
    };

    fn expected(v: f32) -> f32 {
        (f64::from(v) / 2.35) as f32
    }

    #[test]
    fn defaults() {
        let p = ExperimentParameters::default();
        assert_eq!(p.predator_prey_speed_ratio, 1.0);
        assert_eq!(p.predator_speed_canonical, 1.0);
        assert_eq!(p.visual_range, 1.0);
        assert!(!p.spawn_experiment_service);
    }

    #[test]
    fn conversion_divisor_is_fixed() {
        assert_eq!(METRIC_PER_CANONICAL, 2.35);
    }

    #[test]
    fn predator_speed_metric_is_divided_exactly() {
        for v in [0.0f32, 0.5, 1.0, 2.35, 3.7, 10.0, 123.456] {
            let mut p = ExperimentParameters::default();
            p.set_predator_speed_metric(v);
            assert_eq!(p.predator_speed_canonical.to_bits(), expected(v).to_bits());
        }
    }

    #[test]
    fn visual_range_metric_is_divided_exactly() {
        for v in [0.0f32, 0.25, 2.35, 4.7, 50.0] {
            let mut p = ExperimentParameters::default();
            p.set_visual_range_metric(v);
            assert_eq!(p.visual_range.to_bits(), expected(v).to_bits());
        }
    }

    #[test]
    fn repeated_calls_overwrite() {
        let mut p = ExperimentParameters::default();
        p.set_predator_speed_metric(10.0);
        p.set_predator_speed_metric(2.35);
        assert_eq!(p.predator_speed_canonical, metric_to_canonical(2.35));
    }

    #[test]
    fn setters_touch_only_their_field() {
        let mut p = ExperimentParameters::default();
        p.set_visual_range_metric(4.7);
        assert_eq!(p.predator_speed_canonical, 1.0);
        assert_eq!(p.predator_prey_speed_ratio, 1.0);
        assert_eq!(p.visual_range, metric_to_canonical(4.7));
    }

    #[test]
    fn missing_fields_decode_to_defaults() {
        let p: ExperimentParameters =
            serde_json::from_str(r#"{"visual_range": 0.5, "extra": 1}"#).unwrap();
        assert_eq!(p.visual_range, 0.5);
        assert_eq!(p.predator_speed_canonical, 1.0);
    }
}
