//! Property tests for the pure trend and scoring math.

use covenant_core::config::AnomalyConfig;
use covenant_core::models::TrendDirection;
use covenant_temporal::anomaly::score;
use covenant_temporal::trend::{direction_for, stats, TrendClassifier};
use proptest::prelude::*;

fn series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..10_000.0, 0..40)
}

proptest! {
    #[test]
    fn direction_agrees_with_change_unless_volatile(values in series()) {
        let result = TrendClassifier::default().classify_values(&values);
        if result.direction != TrendDirection::Volatile {
            prop_assert_eq!(result.direction, direction_for(result.change_percentage, 10.0));
        }
    }

    #[test]
    fn forecast_band_brackets_prediction(values in series()) {
        let f = TrendClassifier::default().classify_values(&values).forecast;
        prop_assert!(f.lower_bound <= f.predicted_value + 1e-9);
        prop_assert!(f.predicted_value <= f.upper_bound + 1e-9);
        prop_assert!([0.5, 0.7, 0.9].contains(&f.confidence));
    }

    #[test]
    fn short_series_are_never_volatile(values in prop::collection::vec(-1e6f64..1e6, 0..3)) {
        let result = TrendClassifier::default().classify_values(&values);
        prop_assert_ne!(result.direction, TrendDirection::Volatile);
    }

    #[test]
    fn coefficient_of_variation_is_non_negative(values in series()) {
        prop_assert!(stats(&values).coefficient_of_variation >= 0.0);
    }

    #[test]
    fn score_sign_follows_observation(
        baseline in prop::collection::vec(50.0f64..150.0, 3..12),
        observed in 0.0f64..300.0,
    ) {
        let config = AnomalyConfig::default();
        if let Some(s) = score(&baseline, observed, &config) {
            prop_assert_eq!(s.z >= 0.0, observed >= s.baseline);
        }
    }
}
